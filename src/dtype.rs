use std::fmt::{Display, Formatter};

/// Element types supported in `.npy` array data.
///
/// Each type is identified in array headers by a two-character tag such as
/// `"f4"` or `"u1"`, made of a kind character and a byte width.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(into = "&'static str"))]
pub enum DataType {
    Float16,
    Float32,
    Float64,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
}

impl DataType {
    /// All supported types.
    pub const ALL: [DataType; 11] = [
        DataType::Float16,
        DataType::Float32,
        DataType::Float64,
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::Uint8,
        DataType::Uint16,
        DataType::Uint32,
        DataType::Uint64,
    ];

    /// Look up the type for a two-character tag, ignoring any byte-order
    /// marker. Returns `None` if the tag is not supported.
    pub fn from_tag(tag: &str) -> Option<DataType> {
        let dtype = match tag {
            "f2" => DataType::Float16,
            "f4" => DataType::Float32,
            "f8" => DataType::Float64,
            "i1" => DataType::Int8,
            "i2" => DataType::Int16,
            "i4" => DataType::Int32,
            "i8" => DataType::Int64,
            "u1" => DataType::Uint8,
            "u2" => DataType::Uint16,
            "u4" => DataType::Uint32,
            "u8" => DataType::Uint64,
            _ => return None,
        };
        Some(dtype)
    }

    /// Return the two-character tag for this type.
    pub fn tag(self) -> &'static str {
        match self {
            DataType::Float16 => "f2",
            DataType::Float32 => "f4",
            DataType::Float64 => "f8",
            DataType::Int8 => "i1",
            DataType::Int16 => "i2",
            DataType::Int32 => "i4",
            DataType::Int64 => "i8",
            DataType::Uint8 => "u1",
            DataType::Uint16 => "u2",
            DataType::Uint32 => "u4",
            DataType::Uint64 => "u8",
        }
    }

    /// Return the name used for this type when declaring graph operands,
    /// eg. `"float32"`.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Float16 => "float16",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Uint8 => "uint8",
            DataType::Uint16 => "uint16",
            DataType::Uint32 => "uint32",
            DataType::Uint64 => "uint64",
        }
    }

    /// Size of one element in bytes.
    pub fn byte_width(self) -> usize {
        match self {
            DataType::Int8 | DataType::Uint8 => 1,
            DataType::Float16 | DataType::Int16 | DataType::Uint16 => 2,
            DataType::Float32 | DataType::Int32 | DataType::Uint32 => 4,
            DataType::Float64 | DataType::Int64 | DataType::Uint64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(
            self,
            DataType::Float16 | DataType::Float32 | DataType::Float64
        )
    }

    /// Return true if the type can represent negative values. This includes
    /// all float types.
    pub fn is_signed(self) -> bool {
        !matches!(
            self,
            DataType::Uint8 | DataType::Uint16 | DataType::Uint32 | DataType::Uint64
        )
    }
}

impl From<DataType> for &'static str {
    fn from(dtype: DataType) -> &'static str {
        dtype.name()
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
