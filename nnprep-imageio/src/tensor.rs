use rten_tensor::NdTensor;

use crate::canvas::{intrinsic_size, Canvas, VisualSource};
use crate::options::{ChannelScheme, InputOptions, TensorLayout};

/// Number of channels in canvas pixel data (RGBA).
const CANVAS_CHANNELS: usize = 4;

/// Return the RGBA channel that output channel `c` is read from.
pub fn source_channel(c: usize, scheme: ChannelScheme, channels: usize) -> usize {
    match scheme {
        ChannelScheme::Rgb => c,
        ChannelScheme::Bgr => channels - c - 1,
    }
}

/// Return the offset of element `[c, h, w]` in a tensor with dimensions
/// `[channels, height, width]` stored with the given layout.
pub fn pixel_offset(
    [c, h, w]: [usize; 3],
    [channels, height, width]: [usize; 3],
    layout: TensorLayout,
) -> usize {
    match layout {
        TensorLayout::Nchw => c * height * width + h * width + w,
        TensorLayout::Nhwc => h * width * channels + w * channels + c,
    }
}

/// Render `source` onto a canvas of the input size from `options`.
pub fn render<S: VisualSource + ?Sized>(source: &S, options: &InputOptions) -> Canvas {
    let [_, height, width] = options.chw();
    let mut canvas = Canvas::new(width as u32, height as u32);
    let src = source.rgba();

    if let Some(draw) = options.draw_options {
        canvas.draw_image_region(
            &src,
            [draw.sx, draw.sy, draw.s_width, draw.s_height],
            [0, 0],
            [draw.d_width, draw.d_height],
        );
    } else if options.scaled {
        // Shrink the source to fit, preserving its aspect ratio. The rest of
        // the canvas is left as-is.
        let (src_width, src_height) = intrinsic_size(source);
        let resize_ratio = (src_width as f64 / width as f64)
            .max(src_height as f64 / height as f64)
            .max(1.);
        let scaled_width = (src_width as f64 / resize_ratio).floor() as u32;
        let scaled_height = (src_height as f64 / resize_ratio).floor() as u32;
        canvas.draw_image(&src, 0, 0, scaled_width, scaled_height);
    } else {
        canvas.draw_image(&src, 0, 0, width as u32, height as u32);
    }

    canvas
}

/// Convert an image or video frame into an input tensor for a model.
///
/// The source is drawn onto a canvas of the input size given by `options`,
/// then the canvas pixels are normalized per channel and copied into a
/// tensor. The returned tensor has shape `[C, H, W]`, or `[H, W, C]` if the
/// layout is [`TensorLayout::Nhwc`]. The batch dimension is not included.
///
/// Panics if `options` specifies more than 4 channels, or if `mean` or `std`
/// have fewer entries than there are channels.
pub fn build_input_tensor<S: VisualSource + ?Sized>(
    source: &S,
    options: &InputOptions,
) -> NdTensor<f32, 3> {
    let dims @ [channels, height, width] = options.chw();
    let layout = options.layout();
    let mean = options.mean();
    let std = options.std();

    let canvas = render(source, options);
    let pixels: Vec<f32> = if options.norm {
        canvas.pixels().iter().map(|&p| p as f32 / 255.).collect()
    } else {
        canvas.pixels().iter().map(|&p| p as f32).collect()
    };

    let mut data = vec![0.; channels * height * width];
    for c in 0..channels {
        let src_chan = source_channel(c, options.channel_scheme, channels);
        for h in 0..height {
            for w in 0..width {
                let value = pixels[h * width * CANVAS_CHANNELS + w * CANVAS_CHANNELS + src_chan];
                data[pixel_offset([c, h, w], dims, layout)] = (value - mean[c]) / std[c];
            }
        }
    }

    let shape = match layout {
        TensorLayout::Nchw => [channels, height, width],
        TensorLayout::Nhwc => [height, width, channels],
    };
    NdTensor::from_data(shape, data)
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};
    use rten_tensor::prelude::*;

    use super::{build_input_tensor, pixel_offset, render, source_channel};
    use crate::canvas::VideoFrame;
    use crate::options::{ChannelScheme, DrawOptions, InputOptions, TensorLayout};

    /// 2x2 image where every pixel has distinct R, G, B and A values.
    fn test_image() -> RgbaImage {
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(0, 0, Rgba([10, 20, 30, 255]));
        img.put_pixel(1, 0, Rgba([40, 50, 60, 255]));
        img.put_pixel(0, 1, Rgba([70, 80, 90, 255]));
        img.put_pixel(1, 1, Rgba([100, 110, 120, 255]));
        img
    }

    #[test]
    fn test_source_channel() {
        assert_eq!(source_channel(0, ChannelScheme::Rgb, 3), 0);
        assert_eq!(source_channel(2, ChannelScheme::Rgb, 3), 2);
        assert_eq!(source_channel(0, ChannelScheme::Bgr, 3), 2);
        assert_eq!(source_channel(1, ChannelScheme::Bgr, 3), 1);
        assert_eq!(source_channel(2, ChannelScheme::Bgr, 3), 0);
        assert_eq!(source_channel(0, ChannelScheme::Bgr, 4), 3);
    }

    #[test]
    fn test_pixel_offset() {
        let dims = [3, 2, 4];
        assert_eq!(pixel_offset([0, 0, 0], dims, TensorLayout::Nchw), 0);
        assert_eq!(pixel_offset([1, 0, 0], dims, TensorLayout::Nchw), 8);
        assert_eq!(pixel_offset([2, 1, 3], dims, TensorLayout::Nchw), 23);
        assert_eq!(pixel_offset([1, 0, 0], dims, TensorLayout::Nhwc), 1);
        assert_eq!(pixel_offset([0, 0, 1], dims, TensorLayout::Nhwc), 3);
        assert_eq!(pixel_offset([2, 1, 3], dims, TensorLayout::Nhwc), 23);
    }

    #[test]
    fn test_build_nchw_rgb() {
        let options = InputOptions::new([1, 3, 2, 2]);
        let tensor = build_input_tensor(&test_image(), &options);

        assert_eq!(tensor.shape(), [3, 2, 2]);
        assert_eq!(
            tensor.to_vec(),
            [
                10., 40., 70., 100., // R
                20., 50., 80., 110., // G
                30., 60., 90., 120., // B
            ]
        );
    }

    #[test]
    fn test_build_bgr_swaps_channels() {
        let rgb = build_input_tensor(&test_image(), &InputOptions::new([1, 3, 2, 2]));
        let bgr = build_input_tensor(
            &test_image(),
            &InputOptions {
                channel_scheme: ChannelScheme::Bgr,
                ..InputOptions::new([1, 3, 2, 2])
            },
        );

        assert_eq!(bgr.slice(0).to_vec(), rgb.slice(2).to_vec());
        assert_eq!(bgr.slice(1).to_vec(), rgb.slice(1).to_vec());
        assert_eq!(bgr.slice(2).to_vec(), rgb.slice(0).to_vec());
    }

    #[test]
    fn test_build_nhwc() {
        let nchw = build_input_tensor(&test_image(), &InputOptions::new([1, 3, 2, 2]));
        let nhwc = build_input_tensor(
            &test_image(),
            &InputOptions {
                input_layout: Some(TensorLayout::Nhwc),
                ..InputOptions::new([1, 2, 2, 3])
            },
        );

        assert_eq!(nhwc.shape(), [2, 2, 3]);
        assert_eq!(
            nhwc.to_vec(),
            [10., 20., 30., 40., 50., 60., 70., 80., 90., 100., 110., 120.]
        );
        assert_eq!(nhwc.permuted([2, 0, 1]).to_vec(), nchw.to_vec());
    }

    #[test]
    fn test_build_norm_mean_std() {
        let options = InputOptions {
            norm: true,
            mean: Some(vec![0.5, 0., 0.]),
            std: Some(vec![0.5, 1., 2.]),
            ..InputOptions::new([1, 3, 1, 1])
        };
        let img = RgbaImage::from_pixel(1, 1, Rgba([255, 51, 102, 255]));
        let tensor = build_input_tensor(&img, &options);

        let expected = [1., 0.2, 0.2];
        for (x, y) in tensor.iter().zip(expected) {
            assert!((*x - y).abs() < 1e-6, "{} != {}", x, y);
        }
    }

    #[test]
    fn test_build_without_norm_uses_raw_values() {
        let options = InputOptions {
            mean: Some(vec![127.5; 3]),
            std: Some(vec![127.5; 3]),
            ..InputOptions::new([1, 3, 1, 1])
        };
        let img = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 127, 255]));
        let tensor = build_input_tensor(&img, &options);
        assert_eq!(tensor.to_vec()[..2], [1., -1.]);
    }

    #[test]
    fn test_build_includes_alpha_channel() {
        let tensor = build_input_tensor(&test_image(), &InputOptions::new([1, 4, 2, 2]));
        assert_eq!(tensor.slice(3).to_vec(), [255.; 4]);
    }

    #[test]
    fn test_build_stretches_source() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([50, 60, 70, 255]));
        let tensor = build_input_tensor(&img, &InputOptions::new([1, 3, 2, 4]));
        assert_eq!(tensor.shape(), [3, 2, 4]);
        assert_eq!(tensor.slice(0).to_vec(), [50.; 8]);
        assert_eq!(tensor.slice(2).to_vec(), [70.; 8]);
    }

    #[test]
    fn test_scaled_draw_preserves_aspect_ratio() {
        // 8x4 source into a 4x4 input: ratio is 2, so the source is drawn at
        // 4x2 and the bottom half of the canvas stays transparent black.
        let frame = VideoFrame::new(RgbaImage::from_pixel(8, 4, Rgba([9, 9, 9, 255])));
        let options = InputOptions {
            scaled: true,
            ..InputOptions::new([1, 3, 4, 4])
        };
        let tensor = build_input_tensor(&frame, &options);
        let red = tensor.slice(0);
        for h in 0..4 {
            for w in 0..4 {
                let expected = if h < 2 { 9. } else { 0. };
                assert_eq!(red[[h, w]], expected);
            }
        }
    }

    #[test]
    fn test_scaled_draw_does_not_upscale() {
        let img = RgbaImage::from_pixel(2, 1, Rgba([5, 5, 5, 255]));
        let options = InputOptions {
            scaled: true,
            ..InputOptions::new([1, 3, 4, 4])
        };
        let canvas = render(&img, &options);
        assert_eq!((canvas.width(), canvas.height()), (4, 4));
        let canvas = canvas.into_rgba_image();
        assert_eq!(*canvas.get_pixel(1, 0), Rgba([5, 5, 5, 255]));
        assert_eq!(*canvas.get_pixel(2, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(*canvas.get_pixel(0, 1), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_draw_options_crop() {
        let options = InputOptions {
            draw_options: Some(DrawOptions {
                sx: 1,
                sy: 1,
                s_width: 1,
                s_height: 1,
                d_width: 1,
                d_height: 1,
            }),
            // Draw options take precedence.
            scaled: true,
            ..InputOptions::new([1, 3, 1, 1])
        };
        let tensor = build_input_tensor(&test_image(), &options);
        assert_eq!(tensor.to_vec(), [100., 110., 120.]);
    }
}
