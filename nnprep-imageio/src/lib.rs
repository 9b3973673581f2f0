//! Converts images and video frames into input tensors for machine learning
//! models.
//!
//! The conversion mimics drawing the source onto an HTML canvas of the model's
//! input size and reading back the pixels: the source is stretched, scaled to
//! fit or cropped according to [`InputOptions`], then each channel is
//! normalized and written out in the requested channel order and layout.
//!
//! ```
//! use image::{Rgba, RgbaImage};
//! use nnprep_imageio::{build_input_tensor, InputOptions};
//!
//! let img = RgbaImage::from_pixel(4, 4, Rgba([255, 128, 0, 255]));
//! let options = InputOptions::from_json(r#"{
//!     "inputDimensions": [1, 3, 2, 2],
//!     "norm": true
//! }"#).unwrap();
//! let tensor = build_input_tensor(&img, &options);
//! assert_eq!(tensor.into_data()[0], 1.0);
//! ```

use std::error::Error;
use std::path::Path;

use nnprep::{ByteSource, FetchError};

mod canvas;
mod options;
mod tensor;

pub use canvas::{intrinsic_size, Canvas, VideoFrame, VisualSource};
pub use options::{
    ChannelScheme, DrawOptions, InputOptions, TensorLayout, IMAGENET_MEAN, IMAGENET_STD_DEV,
};
pub use tensor::{build_input_tensor, pixel_offset, render, source_channel};

/// Errors reported when loading an image.
#[derive(Debug)]
pub enum ReadImageError {
    /// The image data could not be fetched.
    Fetch(FetchError),
    /// The image could not be decoded.
    ImageError(image::ImageError),
}

impl std::fmt::Display for ReadImageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadImageError::Fetch(e) => write!(f, "failed to fetch image: {}", e),
            ReadImageError::ImageError(e) => write!(f, "failed to read image: {}", e),
        }
    }
}

impl Error for ReadImageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReadImageError::Fetch(e) => Some(e),
            ReadImageError::ImageError(e) => Some(e),
        }
    }
}

/// Read an image from a file.
pub fn read_image<P: AsRef<Path>>(path: P) -> Result<image::DynamicImage, ReadImageError> {
    image::open(path).map_err(ReadImageError::ImageError)
}

/// Decode an image from an encoded buffer, eg. the contents of a PNG file.
pub fn load_image(buf: &[u8]) -> Result<image::DynamicImage, ReadImageError> {
    image::load_from_memory(buf).map_err(ReadImageError::ImageError)
}

/// Fetch an encoded image from `url` and decode it.
pub fn fetch_image(
    source: &dyn ByteSource,
    url: &str,
) -> Result<image::DynamicImage, ReadImageError> {
    let buf = source.fetch_bytes(url).map_err(ReadImageError::Fetch)?;
    load_image(&buf)
}
