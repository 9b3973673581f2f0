//! Helpers for loading inputs and presenting outputs of machine learning
//! models in demos.
//!
//! This crate provides:
//!
//! - Fetching raw bytes from files or HTTP servers ([ByteSource])
//! - Decoding typed arrays from NumPy `.npy` buffers ([decode]) and declaring
//!   them as constants in a graph ([build_constant_from_npy])
//! - Loading newline-delimited class labels ([fetch_labels])
//! - Ranking classification scores ([top_classes])
//!
//! Conversion of images into input tensors is provided by the
//! `nnprep-imageio` crate.
//!
//! ```
//! use nnprep::{decode, encode, top_classes, ArrayData, DecodedArray};
//!
//! let scores = DecodedArray::new(&[1, 4], ArrayData::Float32(vec![0.1, 0.7, 0.05, 0.15]));
//! let npy = encode(&scores);
//!
//! let decoded = decode(&npy).unwrap();
//! let labels: Vec<String> = ["a", "b", "c", "d"].map(String::from).into();
//! let top = top_classes(&decoded.data.to_f32_vec(), &labels);
//! assert_eq!(top[0].label.as_deref(), Some("b"));
//! assert_eq!(top[0].prob, "70.00");
//! ```

mod array;
mod dtype;
mod labels;
pub mod npy;
mod number;
pub mod source;
mod topk;

pub use array::{
    build_constant_from_npy, decode, encode, ArrayData, BuildConstantError, DecodedArray,
    GraphBuilder, OperandDescriptor,
};
pub use dtype::DataType;
pub use labels::{fetch_labels, parse_labels};
pub use npy::{DecodeError, NpyHeader};
pub use number::ByteOrder;
#[cfg(feature = "http")]
pub use source::HttpSource;
pub use source::{fetch_text, ByteSource, FetchError, FileSource};
pub use topk::{top_classes, top_k, LabeledScore};
