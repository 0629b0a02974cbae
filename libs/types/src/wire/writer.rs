use super::WireError;
use byteorder::{BigEndian, WriteBytesExt};
use uuid::Uuid;

/// Appending big-endian writer over a caller-owned buffer
pub struct WireWriter<'a> {
    buf: &'a mut Vec<u8>,
}

impl<'a> WireWriter<'a> {
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        Self { buf }
    }

    /// Total bytes in the underlying buffer
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn put_u8(&mut self, value: u8) -> Result<(), WireError> {
        self.buf.push(value);
        Ok(())
    }

    pub fn put_u16(&mut self, value: u16) -> Result<(), WireError> {
        Ok(self.buf.write_u16::<BigEndian>(value)?)
    }

    pub fn put_u32(&mut self, value: u32) -> Result<(), WireError> {
        Ok(self.buf.write_u32::<BigEndian>(value)?)
    }

    pub fn put_u64(&mut self, value: u64) -> Result<(), WireError> {
        Ok(self.buf.write_u64::<BigEndian>(value)?)
    }

    pub fn put_i32(&mut self, value: i32) -> Result<(), WireError> {
        Ok(self.buf.write_i32::<BigEndian>(value)?)
    }

    pub fn put_i64(&mut self, value: i64) -> Result<(), WireError> {
        Ok(self.buf.write_i64::<BigEndian>(value)?)
    }

    pub fn put_f32(&mut self, value: f32) -> Result<(), WireError> {
        Ok(self.buf.write_f32::<BigEndian>(value)?)
    }

    pub fn put_f64(&mut self, value: f64) -> Result<(), WireError> {
        Ok(self.buf.write_f64::<BigEndian>(value)?)
    }

    pub fn put_bool(&mut self, value: bool) -> Result<(), WireError> {
        self.put_u8(u8::from(value))
    }

    /// Write a `u32` length or count prefix
    pub fn put_len(&mut self, length: usize) -> Result<(), WireError> {
        let prefix = u32::try_from(length).map_err(|_| WireError::LengthOverflow {
            length,
            limit: u32::MAX as usize,
        })?;
        self.put_u32(prefix)
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn put_str(&mut self, value: &str) -> Result<(), WireError> {
        self.put_len(value.len())?;
        self.put_bytes(value.as_bytes());
        Ok(())
    }

    pub fn put_uuid(&mut self, value: &Uuid) {
        self.put_bytes(value.as_bytes());
    }
}
