//! Decoding of typed arrays from `.npy` buffers and declaring them as graph
//! constants.

use std::error::Error;
use std::fmt::{Display, Formatter};

use half::f16;
use rten_tensor::Tensor;
use smallvec::SmallVec;

use crate::dtype::DataType;
use crate::npy::{DecodeError, NpyHeader};
use crate::number::{read_elements, write_elements, ByteOrder, Element};
use crate::source::{ByteSource, FetchError};

/// Typed element buffer. There is one variant for each [`DataType`].
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayData {
    Float16(Vec<f16>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Uint8(Vec<u8>),
    Uint16(Vec<u16>),
    Uint32(Vec<u32>),
    Uint64(Vec<u64>),
}

/// Evaluate `$expr` with `$vec` bound to the element vector of `$data`,
/// whatever its type.
macro_rules! with_elements {
    ($data:expr, $vec:ident => $expr:expr) => {
        match $data {
            ArrayData::Float16($vec) => $expr,
            ArrayData::Float32($vec) => $expr,
            ArrayData::Float64($vec) => $expr,
            ArrayData::Int8($vec) => $expr,
            ArrayData::Int16($vec) => $expr,
            ArrayData::Int32($vec) => $expr,
            ArrayData::Int64($vec) => $expr,
            ArrayData::Uint8($vec) => $expr,
            ArrayData::Uint16($vec) => $expr,
            ArrayData::Uint32($vec) => $expr,
            ArrayData::Uint64($vec) => $expr,
        }
    };
}

impl ArrayData {
    /// Read `len` elements of type `dtype` from the start of `buf`.
    ///
    /// Returns `None` if `buf` is too short.
    pub fn read(dtype: DataType, buf: &[u8], len: usize, order: ByteOrder) -> Option<ArrayData> {
        let data = match dtype {
            DataType::Float16 => ArrayData::Float16(read_elements(buf, len, order)?),
            DataType::Float32 => ArrayData::Float32(read_elements(buf, len, order)?),
            DataType::Float64 => ArrayData::Float64(read_elements(buf, len, order)?),
            DataType::Int8 => ArrayData::Int8(read_elements(buf, len, order)?),
            DataType::Int16 => ArrayData::Int16(read_elements(buf, len, order)?),
            DataType::Int32 => ArrayData::Int32(read_elements(buf, len, order)?),
            DataType::Int64 => ArrayData::Int64(read_elements(buf, len, order)?),
            DataType::Uint8 => ArrayData::Uint8(read_elements(buf, len, order)?),
            DataType::Uint16 => ArrayData::Uint16(read_elements(buf, len, order)?),
            DataType::Uint32 => ArrayData::Uint32(read_elements(buf, len, order)?),
            DataType::Uint64 => ArrayData::Uint64(read_elements(buf, len, order)?),
        };
        Some(data)
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ArrayData::Float16(_) => DataType::Float16,
            ArrayData::Float32(_) => DataType::Float32,
            ArrayData::Float64(_) => DataType::Float64,
            ArrayData::Int8(_) => DataType::Int8,
            ArrayData::Int16(_) => DataType::Int16,
            ArrayData::Int32(_) => DataType::Int32,
            ArrayData::Int64(_) => DataType::Int64,
            ArrayData::Uint8(_) => DataType::Uint8,
            ArrayData::Uint16(_) => DataType::Uint16,
            ArrayData::Uint32(_) => DataType::Uint32,
            ArrayData::Uint64(_) => DataType::Uint64,
        }
    }

    pub fn len(&self) -> usize {
        with_elements!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert all elements to f32.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        with_elements!(self, v => v.iter().map(|x| x.to_f32()).collect())
    }

    /// Append the little-endian encoding of the elements to `out`.
    fn write_le(&self, out: &mut Vec<u8>) {
        with_elements!(self, v => write_elements(v, out))
    }
}

impl From<Vec<f32>> for ArrayData {
    fn from(data: Vec<f32>) -> ArrayData {
        ArrayData::Float32(data)
    }
}

/// An array decoded from a `.npy` buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedArray {
    pub shape: SmallVec<[usize; 4]>,
    pub data: ArrayData,
}

impl DecodedArray {
    /// Create an array from a shape and elements.
    ///
    /// Panics if the number of elements does not match the product of `shape`.
    #[track_caller]
    pub fn new(shape: &[usize], data: ArrayData) -> DecodedArray {
        let len: usize = shape.iter().product();
        assert_eq!(
            len,
            data.len(),
            "data length {} does not match shape {:?}",
            data.len(),
            shape
        );
        DecodedArray {
            shape: SmallVec::from_slice(shape),
            data,
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    /// Return the descriptor used to declare this array as a graph constant.
    pub fn descriptor(&self) -> OperandDescriptor {
        OperandDescriptor {
            data_type: self.data_type(),
            dimensions: self.shape.to_vec(),
        }
    }

    /// Convert this array to a float tensor with the same shape.
    pub fn to_f32_tensor(&self) -> Tensor<f32> {
        Tensor::from_data(self.shape.as_slice(), self.data.to_f32_vec())
    }
}

/// Decode a `.npy` buffer into a typed array.
///
/// Element `i` of the result is read from `elem_size * i` bytes after the
/// header, using the byte order given in the header. Elements are returned
/// in storage order; Fortran-ordered arrays are not transposed.
pub fn decode(buf: &[u8]) -> Result<DecodedArray, DecodeError> {
    let header = NpyHeader::from_buf(buf)?;
    let dtype = DataType::from_tag(&header.tag)
        .ok_or_else(|| DecodeError::UnsupportedDataType(header.tag.clone()))?;
    let len = header
        .len()
        .ok_or_else(|| DecodeError::InvalidHeader("shape is too large".into()))?;

    let raw = &buf[header.data_offset..];
    let expected = len.saturating_mul(dtype.byte_width());
    let data = ArrayData::read(dtype, raw, len, header.byte_order).ok_or(
        DecodeError::DataTooShort {
            expected,
            actual: raw.len(),
        },
    )?;

    Ok(DecodedArray {
        shape: header.shape,
        data,
    })
}

/// Encode an array as a version 1.0 `.npy` buffer with little-endian data.
pub fn encode(array: &DecodedArray) -> Vec<u8> {
    let header = NpyHeader {
        tag: array.data_type().tag().to_string(),
        byte_order: ByteOrder::Little,
        fortran_order: false,
        shape: array.shape.clone(),
        data_offset: 0,
    };
    let mut buf = header.to_buf();
    array.data.write_le(&mut buf);
    buf
}

/// Type and shape of a constant operand declared in a graph.
#[derive(Clone, Debug, PartialEq)]
pub struct OperandDescriptor {
    pub data_type: DataType,
    pub dimensions: Vec<usize>,
}

/// Interface to a computation graph builder which can declare constant
/// tensors.
pub trait GraphBuilder {
    /// Handle to an operand in the graph.
    type Operand;

    type Error;

    /// Declare a constant operand with the given type, shape and elements.
    fn constant(
        &mut self,
        desc: OperandDescriptor,
        data: ArrayData,
    ) -> Result<Self::Operand, Self::Error>;
}

/// Errors reported by [`build_constant_from_npy`].
#[derive(Debug)]
pub enum BuildConstantError<E> {
    /// The `.npy` buffer could not be fetched.
    Fetch(FetchError),
    /// The buffer could not be decoded.
    Decode(DecodeError),
    /// The graph builder rejected the constant.
    Builder(E),
}

impl<E: Display> Display for BuildConstantError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "failed to fetch array: {}", e),
            Self::Decode(e) => write!(f, "failed to decode array: {}", e),
            Self::Builder(e) => write!(f, "failed to declare constant: {}", e),
        }
    }
}

impl<E: Error> Error for BuildConstantError<E> {}

impl<E> From<FetchError> for BuildConstantError<E> {
    fn from(err: FetchError) -> Self {
        Self::Fetch(err)
    }
}

impl<E> From<DecodeError> for BuildConstantError<E> {
    fn from(err: DecodeError) -> Self {
        Self::Decode(err)
    }
}

/// Fetch a `.npy` file from `url`, decode it and declare it as a constant
/// using `builder`.
pub fn build_constant_from_npy<B: GraphBuilder>(
    builder: &mut B,
    source: &dyn ByteSource,
    url: &str,
) -> Result<B::Operand, BuildConstantError<B::Error>> {
    let buf = source.fetch_bytes(url)?;
    let array = decode(&buf)?;
    let desc = array.descriptor();
    builder
        .constant(desc, array.data)
        .map_err(BuildConstantError::Builder)
}
