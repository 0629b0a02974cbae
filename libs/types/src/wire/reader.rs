use super::WireError;
use byteorder::{BigEndian, ByteOrder};
use uuid::Uuid;

/// Bounds-checked big-endian cursor over a received body
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Borrow the next `len` bytes and advance past them
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        if len > self.remaining() {
            return Err(WireError::truncated(len, self.pos, self.remaining()));
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.data[start..self.pos])
    }

    pub fn get_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    pub fn get_u16(&mut self) -> Result<u16, WireError> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub fn get_u32(&mut self) -> Result<u32, WireError> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    pub fn get_u64(&mut self) -> Result<u64, WireError> {
        Ok(BigEndian::read_u64(self.take(8)?))
    }

    pub fn get_i32(&mut self) -> Result<i32, WireError> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    pub fn get_i64(&mut self) -> Result<i64, WireError> {
        Ok(BigEndian::read_i64(self.take(8)?))
    }

    pub fn get_f32(&mut self) -> Result<f32, WireError> {
        Ok(BigEndian::read_f32(self.take(4)?))
    }

    pub fn get_f64(&mut self) -> Result<f64, WireError> {
        Ok(BigEndian::read_f64(self.take(8)?))
    }

    pub fn get_bool(&mut self) -> Result<bool, WireError> {
        let offset = self.pos;
        match self.get_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(WireError::InvalidBool { value, offset }),
        }
    }

    /// Read a `u32` length or count prefix
    ///
    /// `min_element_size` is the smallest encoding of one counted element.
    /// A prefix that could not possibly be satisfied by the remaining input
    /// is rejected before the caller allocates anything for it.
    pub fn get_len(&mut self, min_element_size: usize) -> Result<usize, WireError> {
        let offset = self.pos;
        let len = self.get_u32()? as usize;
        let needed = len.saturating_mul(min_element_size.max(1));
        if needed > self.remaining() {
            return Err(WireError::truncated(needed, offset, self.remaining()));
        }
        Ok(len)
    }

    /// Decode a string prefix + body into `out`, reusing its capacity
    pub fn get_str_into(&mut self, out: &mut String) -> Result<(), WireError> {
        let len = self.get_len(1)?;
        let offset = self.pos;
        let bytes = self.take(len)?;
        let text = std::str::from_utf8(bytes).map_err(|_| WireError::InvalidUtf8 { offset })?;
        out.clear();
        out.push_str(text);
        Ok(())
    }

    pub fn get_uuid(&mut self) -> Result<Uuid, WireError> {
        let bytes = self.take(16)?;
        let mut raw = [0u8; 16];
        raw.copy_from_slice(bytes);
        Ok(Uuid::from_bytes(raw))
    }
}
