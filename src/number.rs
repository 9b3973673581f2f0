use half::f16;

/// Order of bytes within a multi-byte array element.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// Interpret the byte-order character at the start of a `.npy` type
    /// descriptor.
    ///
    /// `<` means little-endian. Every other marker, including `|` (not
    /// applicable) and `=` (native), is read as big-endian.
    pub fn from_marker(marker: char) -> ByteOrder {
        if marker == '<' {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }

    /// Return the marker written for this byte order.
    pub fn marker(self) -> char {
        match self {
            ByteOrder::Little => '<',
            ByteOrder::Big => '>',
        }
    }
}

/// Numeric element types that can be read from and written to raw byte
/// buffers in either byte order.
pub trait Element: Copy {
    /// The `[u8; N]` array type holding the serialized bytes for this value.
    type Bytes: AsRef<[u8]> + for<'a> TryFrom<&'a [u8], Error = std::array::TryFromSliceError>;

    fn from_le_bytes(bytes: Self::Bytes) -> Self;
    fn from_be_bytes(bytes: Self::Bytes) -> Self;
    fn to_le_bytes(self) -> Self::Bytes;

    /// Convert to f32, rounding or losing precision where necessary.
    fn to_f32(self) -> f32;
}

macro_rules! impl_element {
    ($type:ty, $size:literal) => {
        impl Element for $type {
            type Bytes = [u8; $size];

            fn from_le_bytes(bytes: Self::Bytes) -> Self {
                <$type>::from_le_bytes(bytes)
            }

            fn from_be_bytes(bytes: Self::Bytes) -> Self {
                <$type>::from_be_bytes(bytes)
            }

            fn to_le_bytes(self) -> Self::Bytes {
                <$type>::to_le_bytes(self)
            }

            fn to_f32(self) -> f32 {
                self as f32
            }
        }
    };
}

impl_element!(i8, 1);
impl_element!(u8, 1);
impl_element!(i16, 2);
impl_element!(u16, 2);
impl_element!(i32, 4);
impl_element!(u32, 4);
impl_element!(i64, 8);
impl_element!(u64, 8);
impl_element!(f32, 4);
impl_element!(f64, 8);

impl Element for f16 {
    type Bytes = [u8; 2];

    fn from_le_bytes(bytes: Self::Bytes) -> Self {
        f16::from_le_bytes(bytes)
    }

    fn from_be_bytes(bytes: Self::Bytes) -> Self {
        f16::from_be_bytes(bytes)
    }

    fn to_le_bytes(self) -> Self::Bytes {
        f16::to_le_bytes(self)
    }

    fn to_f32(self) -> f32 {
        f16::to_f32(self)
    }
}

/// Read `len` consecutive elements from the start of `buf`.
///
/// Element `i` is read from offset `i * size_of::<T>()`. Returns `None` if
/// `buf` is too short.
pub fn read_elements<T: Element>(buf: &[u8], len: usize, order: ByteOrder) -> Option<Vec<T>> {
    let size = std::mem::size_of::<T>();
    let buf = buf.get(..len.checked_mul(size)?)?;
    buf.chunks_exact(size)
        .map(|chunk| {
            let bytes = T::Bytes::try_from(chunk).ok()?;
            let value = match order {
                ByteOrder::Little => T::from_le_bytes(bytes),
                ByteOrder::Big => T::from_be_bytes(bytes),
            };
            Some(value)
        })
        .collect()
}

/// Append the little-endian encoding of `elements` to `out`.
pub fn write_elements<T: Element>(elements: &[T], out: &mut Vec<u8>) {
    out.reserve(std::mem::size_of_val(elements));
    for &x in elements {
        out.extend(x.to_le_bytes().as_ref());
    }
}

#[cfg(test)]
mod tests {
    use half::f16;

    use super::{read_elements, write_elements, ByteOrder};

    #[test]
    fn test_byte_order_from_marker() {
        assert_eq!(ByteOrder::from_marker('<'), ByteOrder::Little);
        assert_eq!(ByteOrder::from_marker('>'), ByteOrder::Big);
        assert_eq!(ByteOrder::from_marker('|'), ByteOrder::Big);
        assert_eq!(ByteOrder::from_marker('='), ByteOrder::Big);
    }

    #[test]
    fn test_read_elements() {
        let buf = [0x01, 0x02, 0x03, 0x04];

        let le: Vec<u16> = read_elements(&buf, 2, ByteOrder::Little).unwrap();
        assert_eq!(le, [0x0201, 0x0403]);

        let be: Vec<u16> = read_elements(&buf, 2, ByteOrder::Big).unwrap();
        assert_eq!(be, [0x0102, 0x0304]);

        // Trailing bytes beyond `len` elements are ignored.
        let one: Vec<i8> = read_elements(&buf, 1, ByteOrder::Little).unwrap();
        assert_eq!(one, [1]);

        let half: Vec<f16> = read_elements(&[0x00, 0x3c], 1, ByteOrder::Little).unwrap();
        assert_eq!(half[0].to_f32(), 1.0);
    }

    #[test]
    fn test_read_elements_too_short() {
        let buf = [0x01, 0x02, 0x03];
        assert!(read_elements::<u32>(&buf, 1, ByteOrder::Little).is_none());
        assert!(read_elements::<u16>(&buf, 2, ByteOrder::Big).is_none());
    }

    #[test]
    fn test_write_elements() {
        let mut out = Vec::new();
        write_elements(&[1i16, -2], &mut out);
        assert_eq!(out, [0x01, 0x00, 0xfe, 0xff]);
    }
}
