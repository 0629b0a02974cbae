use super::{WireError, WireReader, WireWriter};
use uuid::Uuid;

/// A single value with a fixed wire encoding
///
/// `read_from` decodes in place so reused instances keep their buffers.
pub trait WireField {
    fn write_to(&self, writer: &mut WireWriter<'_>) -> Result<(), WireError>;
    fn read_from(&mut self, reader: &mut WireReader<'_>) -> Result<(), WireError>;
    fn reset(&mut self);

    /// Write the elements of a sequence, after its count prefix
    fn write_seq(items: &[Self], writer: &mut WireWriter<'_>) -> Result<(), WireError>
    where
        Self: Sized,
    {
        for item in items {
            item.write_to(writer)?;
        }
        Ok(())
    }

    /// Decode `count` elements into `out`, reusing the elements it holds
    fn read_seq(
        out: &mut Vec<Self>,
        count: usize,
        reader: &mut WireReader<'_>,
    ) -> Result<(), WireError>
    where
        Self: Sized + Default,
    {
        out.truncate(count);
        for item in out.iter_mut() {
            item.read_from(reader)?;
        }
        while out.len() < count {
            let mut item = Self::default();
            item.read_from(reader)?;
            out.push(item);
        }
        Ok(())
    }
}

macro_rules! impl_scalar_field {
    ($($ty:ty => $put:ident, $get:ident;)*) => {
        $(
            impl WireField for $ty {
                fn write_to(&self, writer: &mut WireWriter<'_>) -> Result<(), WireError> {
                    writer.$put(*self)
                }

                fn read_from(&mut self, reader: &mut WireReader<'_>) -> Result<(), WireError> {
                    *self = reader.$get()?;
                    Ok(())
                }

                fn reset(&mut self) {
                    *self = <$ty>::default();
                }
            }
        )*
    };
}

impl_scalar_field! {
    u16 => put_u16, get_u16;
    u32 => put_u32, get_u32;
    u64 => put_u64, get_u64;
    i32 => put_i32, get_i32;
    i64 => put_i64, get_i64;
    f32 => put_f32, get_f32;
    f64 => put_f64, get_f64;
    bool => put_bool, get_bool;
}

/// Byte sequences (vessel protos, craft files, flag images) move as one copy
impl WireField for u8 {
    fn write_to(&self, writer: &mut WireWriter<'_>) -> Result<(), WireError> {
        writer.put_u8(*self)
    }

    fn read_from(&mut self, reader: &mut WireReader<'_>) -> Result<(), WireError> {
        *self = reader.get_u8()?;
        Ok(())
    }

    fn reset(&mut self) {
        *self = 0;
    }

    fn write_seq(items: &[Self], writer: &mut WireWriter<'_>) -> Result<(), WireError> {
        writer.put_bytes(items);
        Ok(())
    }

    fn read_seq(
        out: &mut Vec<Self>,
        count: usize,
        reader: &mut WireReader<'_>,
    ) -> Result<(), WireError> {
        let bytes = reader.take(count)?;
        out.clear();
        out.extend_from_slice(bytes);
        Ok(())
    }
}

impl WireField for String {
    fn write_to(&self, writer: &mut WireWriter<'_>) -> Result<(), WireError> {
        writer.put_str(self)
    }

    fn read_from(&mut self, reader: &mut WireReader<'_>) -> Result<(), WireError> {
        reader.get_str_into(self)
    }

    fn reset(&mut self) {
        self.clear();
    }
}

impl WireField for Uuid {
    fn write_to(&self, writer: &mut WireWriter<'_>) -> Result<(), WireError> {
        writer.put_uuid(self);
        Ok(())
    }

    fn read_from(&mut self, reader: &mut WireReader<'_>) -> Result<(), WireError> {
        *self = reader.get_uuid()?;
        Ok(())
    }

    fn reset(&mut self) {
        *self = Uuid::nil();
    }
}

/// Count-prefixed sequence; byte blobs are `Vec<u8>`
impl<T: WireField + Default> WireField for Vec<T> {
    fn write_to(&self, writer: &mut WireWriter<'_>) -> Result<(), WireError> {
        writer.put_len(self.len())?;
        T::write_seq(self, writer)
    }

    fn read_from(&mut self, reader: &mut WireReader<'_>) -> Result<(), WireError> {
        // Every element type encodes to at least one byte
        let count = reader.get_len(1)?;
        T::read_seq(self, count, reader)
    }

    fn reset(&mut self) {
        self.clear();
    }
}

impl<T: WireField, const N: usize> WireField for [T; N] {
    fn write_to(&self, writer: &mut WireWriter<'_>) -> Result<(), WireError> {
        for item in self {
            item.write_to(writer)?;
        }
        Ok(())
    }

    fn read_from(&mut self, reader: &mut WireReader<'_>) -> Result<(), WireError> {
        for item in self.iter_mut() {
            item.read_from(reader)?;
        }
        Ok(())
    }

    fn reset(&mut self) {
        for item in self.iter_mut() {
            item.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<T: WireField>(value: &T) -> Vec<u8> {
        let mut buf = Vec::new();
        value.write_to(&mut WireWriter::new(&mut buf)).unwrap();
        buf
    }

    #[test]
    fn test_string_layout() {
        assert_eq!(
            encode(&"hello".to_string()),
            vec![0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o']
        );
    }

    #[test]
    fn test_vec_read_reuses_string_capacity() {
        let source = vec!["alpha".to_string(), "beta".to_string()];
        let bytes = encode(&source);

        let mut target = vec![String::with_capacity(64)];
        let first_ptr = target[0].as_ptr();
        target.read_from(&mut WireReader::new(&bytes)).unwrap();

        assert_eq!(target, source);
        assert_eq!(target[0].as_ptr(), first_ptr);
    }

    #[test]
    fn test_vec_read_shrinks_to_count() {
        let bytes = encode(&vec![7i32]);
        let mut target = vec![1i32, 2, 3];
        target.read_from(&mut WireReader::new(&bytes)).unwrap();
        assert_eq!(target, vec![7]);
    }

    #[test]
    fn test_byte_blob_copied_in_one_piece() {
        let blob: Vec<u8> = (0..=255).cycle().take(100_000).collect();
        let bytes = encode(&blob);
        assert_eq!(&bytes[..4], &100_000u32.to_be_bytes());
        assert_eq!(&bytes[4..], blob.as_slice());

        let mut target: Vec<u8> = Vec::with_capacity(200_000);
        let ptr = target.as_ptr();
        let mut reader = WireReader::new(&bytes);
        target.read_from(&mut reader).unwrap();
        assert_eq!(target, blob);
        assert_eq!(target.as_ptr(), ptr);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_truncated_byte_blob_rejected() {
        let mut bytes = encode(&vec![1u8, 2, 3, 4]);
        bytes.pop();
        let mut target: Vec<u8> = Vec::new();
        assert!(matches!(
            target.read_from(&mut WireReader::new(&bytes)),
            Err(WireError::Truncated { .. })
        ));
    }

    #[test]
    fn test_array_has_no_count_prefix() {
        assert_eq!(encode(&[1u16, 2u16]), vec![0, 1, 0, 2]);
    }

    #[test]
    fn test_reset_clears_but_keeps_capacity() {
        let mut text = String::from("a long chat line");
        let capacity = text.capacity();
        text.reset();
        assert!(text.is_empty());
        assert_eq!(text.capacity(), capacity);

        let mut id = Uuid::from_u128(42);
        id.reset();
        assert!(id.is_nil());

        let mut velocity = [1.0f64, 2.0, 3.0];
        velocity.reset();
        assert_eq!(velocity, [0.0; 3]);
    }
}
