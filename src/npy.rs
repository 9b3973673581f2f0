//! Reading and writing headers of NumPy `.npy` files.
//!
//! A `.npy` file consists of the magic bytes `\x93NUMPY`, a two-byte format
//! version, the length of a header string, the header string itself and then
//! the raw array data. The header is a Python dict literal such as
//! `{'descr': '<f4', 'fortran_order': False, 'shape': (2, 3), }`.
//!
//! See <https://numpy.org/doc/stable/reference/generated/numpy.lib.format.html>.

use std::error::Error;
use std::fmt::{Display, Formatter};

use smallvec::SmallVec;

use crate::number::ByteOrder;

/// Read little-endian encoded values from a byte buffer.
struct ValueReader<'a> {
    pos: usize,
    buf: &'a [u8],
}

impl<'a> ValueReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { pos: 0, buf }
    }

    /// Return the next N bytes from the buffer, or None if there aren't enough.
    fn read_n<const N: usize>(&mut self) -> Option<[u8; N]> {
        let chunk = self.buf.get(self.pos..self.pos.checked_add(N)?)?;
        self.pos += N;
        chunk.try_into().ok()
    }

    /// Return the next `len` bytes as a slice.
    fn read_slice(&mut self, len: usize) -> Option<&'a [u8]> {
        let chunk = self.buf.get(self.pos..self.pos.checked_add(len)?)?;
        self.pos += len;
        Some(chunk)
    }
}

/// Errors produced when decoding `.npy` data.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodeError {
    /// The buffer ends before the end of the header.
    TooShort,

    /// The buffer doesn't start with the `\x93NUMPY` magic bytes.
    InvalidMagic,

    /// The major format version is not 1, 2 or 3.
    UnsupportedVersion(u8),

    /// The header dict could not be parsed.
    InvalidHeader(String),

    /// The element type tag is not in the supported type table.
    UnsupportedDataType(String),

    /// The buffer holds fewer data bytes than the shape and type require.
    DataTooShort { expected: usize, actual: usize },
}

impl Display for DecodeError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::TooShort => write!(fmt, "header is too short"),
            DecodeError::InvalidMagic => write!(fmt, "incorrect file magic"),
            DecodeError::UnsupportedVersion(major) => {
                write!(fmt, "unsupported file version {}", major)
            }
            DecodeError::InvalidHeader(reason) => write!(fmt, "invalid header: {}", reason),
            DecodeError::UnsupportedDataType(tag) => {
                write!(fmt, "data type {} is not supported", tag)
            }
            DecodeError::DataTooShort { expected, actual } => write!(
                fmt,
                "array data is too short: expected {} bytes, found {}",
                expected, actual
            ),
        }
    }
}

impl Error for DecodeError {}

fn invalid_header(reason: &str) -> DecodeError {
    DecodeError::InvalidHeader(reason.to_string())
}

/// Parsed `.npy` header.
#[derive(Clone, Debug, PartialEq)]
pub struct NpyHeader {
    /// Two-character element type tag, without the byte-order marker.
    ///
    /// This is kept as a string so that callers can report tags which are not
    /// in the supported type table.
    pub tag: String,

    /// Byte order of multi-byte elements.
    pub byte_order: ByteOrder,

    /// Whether the data is stored in column-major order.
    pub fortran_order: bool,

    /// Array shape. An empty shape denotes a scalar.
    pub shape: SmallVec<[usize; 4]>,

    /// Offset of the first data byte from the start of the buffer.
    pub data_offset: usize,
}

impl NpyHeader {
    /// Magic bytes at the start of every `.npy` file.
    pub const MAGIC: &'static [u8; 6] = b"\x93NUMPY";

    /// Read the header from the start of `buf`.
    pub fn from_buf(buf: &[u8]) -> Result<NpyHeader, DecodeError> {
        let mut reader = ValueReader::new(buf);

        let Some(magic) = reader.read_n::<6>() else {
            return Err(DecodeError::TooShort);
        };
        if &magic != Self::MAGIC {
            return Err(DecodeError::InvalidMagic);
        }

        let Some([major, _minor]) = reader.read_n::<2>() else {
            return Err(DecodeError::TooShort);
        };
        let header_len = match major {
            1 => reader.read_n::<2>().map(|len| u16::from_le_bytes(len) as usize),
            2 | 3 => reader.read_n::<4>().map(|len| u32::from_le_bytes(len) as usize),
            _ => return Err(DecodeError::UnsupportedVersion(major)),
        }
        .ok_or(DecodeError::TooShort)?;

        let header_bytes = reader.read_slice(header_len).ok_or(DecodeError::TooShort)?;
        let header = std::str::from_utf8(header_bytes)
            .map_err(|_| invalid_header("header is not valid UTF-8"))?;

        let descr = parse_descr(header)?;
        let (byte_order, tag) = match descr.chars().next() {
            Some(marker @ ('<' | '>' | '|' | '=')) => (ByteOrder::from_marker(marker), &descr[1..]),
            _ => (ByteOrder::Big, descr),
        };
        let fortran_order = parse_fortran_order(header)?;
        let shape = parse_shape(header)?;

        Ok(NpyHeader {
            tag: tag.to_string(),
            byte_order,
            fortran_order,
            shape,
            data_offset: reader.pos,
        })
    }

    /// Return the number of elements in the array.
    ///
    /// Returns `None` if the product of the shape overflows.
    pub fn len(&self) -> Option<usize> {
        self.shape
            .iter()
            .try_fold(1usize, |len, &size| len.checked_mul(size))
    }

    /// Serialize the header to a byte buffer.
    ///
    /// A version 1.0 header is written unless the header dict is too long for
    /// its 16-bit length field, in which case version 2.0 is used. The dict is
    /// padded with spaces so that the array data which follows starts at a
    /// multiple of 64 bytes.
    pub fn to_buf(&self) -> Vec<u8> {
        let marker = if self.tag.ends_with('1') {
            '|'
        } else {
            self.byte_order.marker()
        };
        let shape = match self.shape.as_slice() {
            [size] => format!("({},)", size),
            sizes => {
                let sizes: Vec<String> = sizes.iter().map(|s| s.to_string()).collect();
                format!("({})", sizes.join(", "))
            }
        };
        let fortran_order = if self.fortran_order { "True" } else { "False" };
        let dict = format!(
            "{{'descr': '{}{}', 'fortran_order': {}, 'shape': {}, }}",
            marker, self.tag, fortran_order, shape
        );

        // Magic and version are followed by a 2 byte (v1) or 4 byte (v2)
        // length. The dict is terminated by a newline.
        let padded_dict = |len_size: usize| {
            let unpadded_len = Self::MAGIC.len() + 2 + len_size + dict.len() + 1;
            let padding = (64 - unpadded_len % 64) % 64;
            format!("{}{}\n", dict, " ".repeat(padding))
        };

        let mut buffer = Vec::new();
        buffer.extend(Self::MAGIC);
        let v1_dict = padded_dict(2);
        match u16::try_from(v1_dict.len()) {
            Ok(len) => {
                buffer.extend([1, 0]);
                buffer.extend(len.to_le_bytes());
                buffer.extend(v1_dict.as_bytes());
            }
            Err(_) => {
                let v2_dict = padded_dict(4);
                buffer.extend([2, 0]);
                buffer.extend((v2_dict.len() as u32).to_le_bytes());
                buffer.extend(v2_dict.as_bytes());
            }
        }
        buffer
    }
}

/// Return the text following `key:` in a header dict.
fn dict_value<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let start = header
        .find(&format!("'{}'", key))
        .or_else(|| header.find(&format!("\"{}\"", key)))?;
    let rest = &header[start + key.len() + 2..];
    let rest = rest.trim_start().strip_prefix(':')?;
    Some(rest.trim_start())
}

fn parse_descr(header: &str) -> Result<&str, DecodeError> {
    let value = dict_value(header, "descr").ok_or_else(|| invalid_header("missing descr"))?;
    let quote = value
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| invalid_header("descr is not a string"))?;
    let value = &value[1..];
    let end = value
        .find(quote)
        .ok_or_else(|| invalid_header("unterminated descr"))?;
    Ok(&value[..end])
}

fn parse_fortran_order(header: &str) -> Result<bool, DecodeError> {
    let value =
        dict_value(header, "fortran_order").ok_or_else(|| invalid_header("missing fortran_order"))?;
    if value.starts_with("True") {
        Ok(true)
    } else if value.starts_with("False") {
        Ok(false)
    } else {
        Err(invalid_header("fortran_order is not a bool"))
    }
}

fn parse_shape(header: &str) -> Result<SmallVec<[usize; 4]>, DecodeError> {
    let value = dict_value(header, "shape").ok_or_else(|| invalid_header("missing shape"))?;
    let value = value
        .strip_prefix('(')
        .ok_or_else(|| invalid_header("shape is not a tuple"))?;
    let end = value
        .find(')')
        .ok_or_else(|| invalid_header("unterminated shape"))?;
    value[..end]
        .split(',')
        .map(str::trim)
        .filter(|size| !size.is_empty())
        .map(|size| {
            size.trim_end_matches('L')
                .parse()
                .map_err(|_| invalid_header("shape contains an invalid size"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use smallvec::smallvec;

    use super::{DecodeError, NpyHeader};
    use crate::number::ByteOrder;

    fn header_buf(dict: &str) -> Vec<u8> {
        let mut buf = NpyHeader::MAGIC.to_vec();
        buf.extend([1, 0]);
        buf.extend((dict.len() as u16).to_le_bytes());
        buf.extend(dict.as_bytes());
        buf
    }

    #[test]
    fn test_read_header() {
        let buf = header_buf("{'descr': '<f4', 'fortran_order': False, 'shape': (2, 3), }\n");
        let header = NpyHeader::from_buf(&buf).unwrap();

        assert_eq!(
            header,
            NpyHeader {
                tag: "f4".into(),
                byte_order: ByteOrder::Little,
                fortran_order: false,
                shape: smallvec![2, 3],
                data_offset: buf.len(),
            }
        );
        assert_eq!(header.len(), Some(6));
    }

    #[test]
    fn test_read_header_variants() {
        struct Case {
            dict: &'static str,
            tag: &'static str,
            byte_order: ByteOrder,
            shape: Vec<usize>,
        }

        let cases = [
            // Scalar
            Case {
                dict: "{'descr': '>i8', 'fortran_order': False, 'shape': (), }",
                tag: "i8",
                byte_order: ByteOrder::Big,
                shape: vec![],
            },
            // 1D with trailing comma
            Case {
                dict: "{'descr': '|u1', 'fortran_order': False, 'shape': (5,), }",
                tag: "u1",
                byte_order: ByteOrder::Big,
                shape: vec![5],
            },
            // Keys in a different order, double quotes.
            Case {
                dict: "{\"shape\": (1, 3, 224, 224), \"fortran_order\": False, \"descr\": \"<f2\"}",
                tag: "f2",
                byte_order: ByteOrder::Little,
                shape: vec![1, 3, 224, 224],
            },
            // Unsupported tags are still parsed.
            Case {
                dict: "{'descr': '<c8', 'fortran_order': False, 'shape': (4,), }",
                tag: "c8",
                byte_order: ByteOrder::Little,
                shape: vec![4],
            },
        ];

        for Case {
            dict,
            tag,
            byte_order,
            shape,
        } in cases
        {
            let header = NpyHeader::from_buf(&header_buf(dict)).unwrap();
            assert_eq!(header.tag, tag);
            assert_eq!(header.byte_order, byte_order);
            assert_eq!(header.shape.as_slice(), shape.as_slice());
        }
    }

    #[test]
    fn test_invalid_header() {
        struct Case {
            buf: Vec<u8>,
            expected: DecodeError,
        }

        let mut version_2_too_short = NpyHeader::MAGIC.to_vec();
        version_2_too_short.extend([2, 0, 10, 0]);

        let mut version_4 = NpyHeader::MAGIC.to_vec();
        version_4.extend([4, 0, 0, 0]);

        let cases = [
            Case {
                buf: Vec::new(),
                expected: DecodeError::TooShort,
            },
            Case {
                buf: b"This is some random ASCII text and not a valid header".to_vec(),
                expected: DecodeError::InvalidMagic,
            },
            Case {
                buf: version_4,
                expected: DecodeError::UnsupportedVersion(4),
            },
            Case {
                buf: version_2_too_short,
                expected: DecodeError::TooShort,
            },
            Case {
                buf: {
                    let mut buf = header_buf("{'descr': '<f4', 'shape': (2,), }");
                    buf.truncate(buf.len() - 4);
                    buf
                },
                expected: DecodeError::TooShort,
            },
            Case {
                buf: header_buf("{'fortran_order': False, 'shape': (2,), }"),
                expected: DecodeError::InvalidHeader("missing descr".into()),
            },
            Case {
                buf: header_buf("{'descr': '<f4', 'fortran_order': False, 'shape': 2, }"),
                expected: DecodeError::InvalidHeader("shape is not a tuple".into()),
            },
            Case {
                buf: header_buf("{'descr': '<f4', 'fortran_order': False, 'shape': (2, x), }"),
                expected: DecodeError::InvalidHeader("shape contains an invalid size".into()),
            },
        ];

        for Case { buf, expected } in cases {
            let result = NpyHeader::from_buf(&buf);
            assert_eq!(result, Err(expected));
        }
    }

    #[test]
    fn test_write_header() {
        let header = NpyHeader {
            tag: "f4".into(),
            byte_order: ByteOrder::Little,
            fortran_order: false,
            shape: smallvec![3],
            data_offset: 0,
        };
        let buf = header.to_buf();

        assert_eq!(buf.len() % 64, 0);
        assert_eq!(buf.last(), Some(&b'\n'));
        assert_eq!(&buf[6..8], &[1, 0]);

        let parsed = NpyHeader::from_buf(&buf).unwrap();
        assert_eq!(parsed.tag, "f4");
        assert_eq!(parsed.shape.as_slice(), &[3]);
        assert_eq!(parsed.data_offset, buf.len());
    }

    #[test]
    fn test_write_long_header() {
        let header = NpyHeader {
            tag: "u1".into(),
            byte_order: ByteOrder::Little,
            fortran_order: false,
            shape: std::iter::repeat(1).take(30_000).collect(),
            data_offset: 0,
        };
        let buf = header.to_buf();

        assert_eq!(&buf[6..8], &[2, 0]);
        assert_eq!(buf.len() % 64, 0);
        let header_len = u32::from_le_bytes(buf[8..12].try_into().unwrap()) as usize;
        assert_eq!(header_len + 12, buf.len());
        assert!(header_len > u16::MAX as usize);

        let parsed = NpyHeader::from_buf(&buf).unwrap();
        assert_eq!(parsed.shape.len(), 30_000);
        assert_eq!(parsed.len(), Some(1));
        assert_eq!(parsed.data_offset, buf.len());
    }

    #[test]
    fn test_decode_error_names_tag() {
        let err = DecodeError::UnsupportedDataType("z9".into());
        assert_eq!(err.to_string(), "data type z9 is not supported");
    }
}
