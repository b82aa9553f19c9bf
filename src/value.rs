//! Fixed-size value codec
//!
//! Every slot stores values of one type whose encoded width never changes.
//! The byte layout belongs to the value type; the ring only moves bytes.

/// A value that can live in a wear-leveled data cell.
///
/// `encode` receives a buffer of exactly `SIZE` bytes and must fill all of it.
/// `decode` receives a slice of exactly `SIZE` bytes.
pub trait CellValue: Sized {
    /// Encoded width in bytes. Must be at least 1.
    const SIZE: usize;

    fn encode(&self, out: &mut [u8]);

    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! impl_cell_value_le {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CellValue for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn encode(&self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                fn decode(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_cell_value_le!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl<const N: usize> CellValue for [u8; N] {
    const SIZE: usize = N;

    fn encode(&self, out: &mut [u8]) {
        out.copy_from_slice(self);
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut raw = [0u8; N];
        raw.copy_from_slice(bytes);
        raw
    }
}

/// Encode a value into a freshly allocated buffer of `T::SIZE` bytes.
pub fn encode_to_vec<T: CellValue>(value: &T) -> Vec<u8> {
    let mut buf = vec![0u8; T::SIZE];
    value.encode(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_match_native_widths() {
        assert_eq!(<u8 as CellValue>::SIZE, 1);
        assert_eq!(<u16 as CellValue>::SIZE, 2);
        assert_eq!(<i32 as CellValue>::SIZE, 4);
        assert_eq!(<f64 as CellValue>::SIZE, 8);
        assert_eq!(<[u8; 12] as CellValue>::SIZE, 12);
    }

    #[test]
    fn test_little_endian_layout() {
        assert_eq!(encode_to_vec(&0x1234_5678u32), vec![0x78, 0x56, 0x34, 0x12]);
        assert_eq!(encode_to_vec(&-2i16), vec![0xFE, 0xFF]);
    }

    #[test]
    fn test_decode_float() {
        let bytes = encode_to_vec(&21.5f32);
        assert_eq!(f32::decode(&bytes), 21.5);
    }

    #[test]
    fn test_byte_array_is_copied_verbatim() {
        let value = *b"calib";
        assert_eq!(encode_to_vec(&value), b"calib".to_vec());
        assert_eq!(<[u8; 5]>::decode(b"calib"), value);
    }
}
