use serde::{Deserialize, Serialize};

/// Standard ImageNet normalization mean values, for pixel values in [0, 1].
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Standard ImageNet normalization standard deviation values, for pixel
/// values in [0, 1].
pub const IMAGENET_STD_DEV: [f32; 3] = [0.229, 0.224, 0.225];

const DEFAULT_MEAN: [f32; 4] = [0.; 4];
const DEFAULT_STD: [f32; 4] = [1.; 4];

/// Order of color channels in the input tensor.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum ChannelScheme {
    #[default]
    #[serde(rename = "RGB")]
    Rgb,
    #[serde(rename = "BGR")]
    Bgr,
}

/// Order of dimensions in the input tensor.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// Channels-first. Values for each channel are stored contiguously.
    #[default]
    Nchw,
    /// Channels-last. Channel values for each pixel are interleaved.
    Nhwc,
}

/// Region of the source image to draw, and the size to scale it to.
///
/// The scaled region is drawn at the top-left corner of the canvas.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawOptions {
    pub sx: u32,
    pub sy: u32,
    pub s_width: u32,
    pub s_height: u32,
    pub d_width: u32,
    pub d_height: u32,
}

/// Describes the input format that a model expects.
///
/// This can be deserialized from JSON such as:
///
/// ```json
/// {
///   "inputDimensions": [1, 224, 224, 3],
///   "inputLayout": "nhwc",
///   "mean": [127.5, 127.5, 127.5],
///   "std": [127.5, 127.5, 127.5],
///   "channelScheme": "BGR"
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputOptions {
    /// Shape of the model input. The order is `[N, C, H, W]`, or
    /// `[N, H, W, C]` if the layout is [`TensorLayout::Nhwc`].
    pub input_dimensions: [usize; 4],

    /// Per-channel mean subtracted from pixel values. Defaults to zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<Vec<f32>>,

    /// Per-channel standard deviation that pixel values are divided by.
    /// Defaults to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std: Option<Vec<f32>>,

    /// Scale pixel values from [0, 255] to [0, 1] before applying `mean`
    /// and `std`.
    #[serde(default)]
    pub norm: bool,

    #[serde(default)]
    pub channel_scheme: ChannelScheme,

    /// Preserve the aspect ratio of the source, shrinking it to fit within
    /// the input size if needed, instead of stretching it to fill.
    #[serde(default, rename = "scaledFlag")]
    pub scaled: bool,

    /// Tensor layout. If not set, the layout is [`TensorLayout::Nchw`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_layout: Option<TensorLayout>,

    /// Draw a sub-region of the source instead of the whole image. Takes
    /// precedence over `scaled`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw_options: Option<DrawOptions>,
}

impl InputOptions {
    /// Create options for an input with the given dimensions and default
    /// settings for everything else.
    pub fn new(input_dimensions: [usize; 4]) -> InputOptions {
        InputOptions {
            input_dimensions,
            ..Default::default()
        }
    }

    /// Create options which apply ImageNet normalization to RGB inputs.
    pub fn imagenet(input_dimensions: [usize; 4]) -> InputOptions {
        InputOptions {
            input_dimensions,
            mean: Some(IMAGENET_MEAN.to_vec()),
            std: Some(IMAGENET_STD_DEV.to_vec()),
            norm: true,
            ..Default::default()
        }
    }

    /// Parse options from a JSON object.
    pub fn from_json(json: &str) -> Result<InputOptions, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn layout(&self) -> TensorLayout {
        self.input_layout.unwrap_or_default()
    }

    /// Return the `[channels, height, width]` of the input.
    pub fn chw(&self) -> [usize; 3] {
        let [_batch, a, b, c] = self.input_dimensions;
        match self.layout() {
            TensorLayout::Nchw => [a, b, c],
            TensorLayout::Nhwc => [c, a, b],
        }
    }

    pub fn mean(&self) -> &[f32] {
        self.mean.as_deref().unwrap_or(&DEFAULT_MEAN)
    }

    pub fn std(&self) -> &[f32] {
        self.std.as_deref().unwrap_or(&DEFAULT_STD)
    }
}
