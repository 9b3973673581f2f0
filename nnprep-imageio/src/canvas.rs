use std::borrow::Cow;

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

/// A still image or video frame which can be drawn onto a [`Canvas`].
pub trait VisualSource {
    /// Intrinsic size of a still image, or `(0, 0)` if this is not an image.
    fn natural_size(&self) -> (u32, u32);

    /// Intrinsic size of a video, or `(0, 0)` if this is not a video.
    fn video_size(&self) -> (u32, u32) {
        (0, 0)
    }

    /// Return the current content as RGBA pixels.
    fn rgba(&self) -> Cow<'_, RgbaImage>;
}

/// Return the size of `source`, preferring the video size over the natural
/// size for each dimension that is non-zero.
pub fn intrinsic_size<S: VisualSource + ?Sized>(source: &S) -> (u32, u32) {
    let (video_width, video_height) = source.video_size();
    let (natural_width, natural_height) = source.natural_size();
    let width = if video_width != 0 {
        video_width
    } else {
        natural_width
    };
    let height = if video_height != 0 {
        video_height
    } else {
        natural_height
    };
    (width, height)
}

impl VisualSource for RgbaImage {
    fn natural_size(&self) -> (u32, u32) {
        self.dimensions()
    }

    fn rgba(&self) -> Cow<'_, RgbaImage> {
        Cow::Borrowed(self)
    }
}

impl VisualSource for DynamicImage {
    fn natural_size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn rgba(&self) -> Cow<'_, RgbaImage> {
        match self {
            DynamicImage::ImageRgba8(img) => Cow::Borrowed(img),
            other => Cow::Owned(other.to_rgba8()),
        }
    }
}

/// A decoded frame from a video stream.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    frame: RgbaImage,
}

impl VideoFrame {
    pub fn new(frame: RgbaImage) -> VideoFrame {
        VideoFrame { frame }
    }
}

impl VisualSource for VideoFrame {
    fn natural_size(&self) -> (u32, u32) {
        (0, 0)
    }

    fn video_size(&self) -> (u32, u32) {
        self.frame.dimensions()
    }

    fn rgba(&self) -> Cow<'_, RgbaImage> {
        Cow::Borrowed(&self.frame)
    }
}

/// Off-screen RGBA drawing surface.
///
/// A new canvas is filled with transparent black. Drawing composites source
/// pixels over existing content and clips to the canvas bounds.
#[derive(Clone, Debug)]
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Canvas {
        Canvas {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Draw all of `src`, scaled to `width` x `height`, with its top-left
    /// corner at `(x, y)`.
    pub fn draw_image(&mut self, src: &RgbaImage, x: i64, y: i64, width: u32, height: u32) {
        let (src_width, src_height) = src.dimensions();
        self.draw_image_region(
            src,
            [0, 0, src_width, src_height],
            [x, y],
            [width, height],
        );
    }

    /// Draw the region `[sx, sy, s_width, s_height]` of `src`, scaled to
    /// `[d_width, d_height]`, with its top-left corner at `[dx, dy]`.
    ///
    /// Parts of the source region outside `src` are skipped, and the
    /// destination region shrinks in proportion.
    pub fn draw_image_region(
        &mut self,
        src: &RgbaImage,
        [sx, sy, s_width, s_height]: [u32; 4],
        [dx, dy]: [i64; 2],
        [d_width, d_height]: [u32; 2],
    ) {
        if s_width == 0 || s_height == 0 {
            return;
        }

        let clipped_width = src.width().saturating_sub(sx).min(s_width);
        let clipped_height = src.height().saturating_sub(sy).min(s_height);
        let d_width = scale_len(d_width, clipped_width, s_width);
        let d_height = scale_len(d_height, clipped_height, s_height);
        if d_width == 0 || d_height == 0 {
            return;
        }

        let region = imageops::crop_imm(src, sx, sy, clipped_width, clipped_height).to_image();
        let scaled = if region.dimensions() == (d_width, d_height) {
            region
        } else {
            imageops::resize(&region, d_width, d_height, FilterType::Triangle)
        };
        imageops::overlay(&mut self.image, &scaled, dx, dy);
    }

    /// Return the RGBA bytes of the whole canvas, in row-major order.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn into_rgba_image(self) -> RgbaImage {
        self.image
    }
}

/// Scale a destination length by the fraction `part / whole` of the source
/// length that is being drawn.
fn scale_len(len: u32, part: u32, whole: u32) -> u32 {
    if part == whole {
        len
    } else {
        ((len as u64 * part as u64) as f64 / whole as f64).round() as u32
    }
}
