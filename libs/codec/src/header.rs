//! # Wire Header Codec
//!
//! ## Purpose
//!
//! Encodes and decodes the fixed 8-byte header that precedes every message
//! body. The layout is big-endian regardless of host byte order:
//!
//! ```text
//! ┌──────────────┬──────────────┬─────────────────────────────────┐
//! │ Message Type │   SubType    │ C │     body length (31 bits)   │
//! │   u16 BE     │   u16 BE     │ 1 │                             │
//! └──────────────┴──────────────┴─────────────────────────────────┘
//!   bytes 0-1      bytes 2-3      bytes 4-7 (u32 BE, C = compressed)
//! ```
//!
//! ## Failure Modes
//!
//! - Building a header for a body longer than [`MAX_PAYLOAD_LENGTH`] fails
//!   with [`CodecError::PayloadTooLarge`]; the length is never truncated.
//! - Decoding fewer than [`HEADER_SIZE`] bytes, or a frame whose declared
//!   length differs from the bytes actually present, fails with
//!   [`CodecError::MalformedHeader`].

use crate::error::{CodecError, CodecResult};
use byteorder::{BigEndian, ByteOrder};
use orbitlink_types::protocol::{
    COMPRESSED_FLAG, LENGTH_MASK, LENGTH_OFFSET, MESSAGE_TYPE_OFFSET, SUB_TYPE_OFFSET,
};
use orbitlink_types::{MessageType, HEADER_SIZE, MAX_PAYLOAD_LENGTH};

/// Decoded message header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHeader {
    message_type: u16,
    sub_type: u16,
    payload_length: u32,
    compressed: bool,
}

impl MessageHeader {
    /// Build a header, rejecting lengths the 31-bit field cannot carry
    pub fn new(
        message_type: u16,
        sub_type: u16,
        payload_length: usize,
        compressed: bool,
    ) -> CodecResult<Self> {
        let payload_length = u32::try_from(payload_length)
            .ok()
            .filter(|len| *len <= MAX_PAYLOAD_LENGTH)
            .ok_or(CodecError::PayloadTooLarge {
                length: payload_length,
                limit: MAX_PAYLOAD_LENGTH,
            })?;

        Ok(Self {
            message_type,
            sub_type,
            payload_length,
            compressed,
        })
    }

    pub fn message_type(&self) -> u16 {
        self.message_type
    }

    /// Message Type as a catalogue family, `None` for unknown ids
    pub fn family(&self) -> Option<MessageType> {
        MessageType::from_wire(self.message_type)
    }

    pub fn sub_type(&self) -> u16 {
        self.sub_type
    }

    pub fn payload_length(&self) -> usize {
        self.payload_length as usize
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        BigEndian::write_u16(&mut out[MESSAGE_TYPE_OFFSET..], self.message_type);
        BigEndian::write_u16(&mut out[SUB_TYPE_OFFSET..], self.sub_type);

        let mut packed = self.payload_length & LENGTH_MASK;
        if self.compressed {
            packed |= COMPRESSED_FLAG;
        }
        BigEndian::write_u32(&mut out[LENGTH_OFFSET..], packed);
        out
    }

    /// Append the encoded header to `out`
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.encode());
    }

    /// Decode the first [`HEADER_SIZE`] bytes of `bytes`
    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(CodecError::malformed_header(
                format!("need {} header bytes", HEADER_SIZE),
                bytes.len(),
            ));
        }

        let packed = BigEndian::read_u32(&bytes[LENGTH_OFFSET..]);
        Ok(Self {
            message_type: BigEndian::read_u16(&bytes[MESSAGE_TYPE_OFFSET..]),
            sub_type: BigEndian::read_u16(&bytes[SUB_TYPE_OFFSET..]),
            payload_length: packed & LENGTH_MASK,
            compressed: packed & COMPRESSED_FLAG != 0,
        })
    }

    /// Decode a complete datagram and split off its body
    ///
    /// The declared length must match the received body exactly.
    pub fn decode_frame(datagram: &[u8]) -> CodecResult<(Self, &[u8])> {
        let header = Self::decode(datagram)?;
        let body = &datagram[HEADER_SIZE..];
        if body.len() != header.payload_length() {
            return Err(CodecError::malformed_header(
                format!(
                    "declared {} body bytes, got {}",
                    header.payload_length,
                    body.len()
                ),
                datagram.len(),
            ));
        }
        Ok((header, body))
    }
}

/// Encode a header from raw parts
pub fn encode_header(
    message_type: u16,
    sub_type: u16,
    payload_length: usize,
    compressed: bool,
) -> CodecResult<[u8; HEADER_SIZE]> {
    MessageHeader::new(message_type, sub_type, payload_length, compressed).map(|h| h.encode())
}

/// Decode a header into `(message_type, sub_type, payload_length, compressed)`
pub fn decode_header(bytes: &[u8]) -> CodecResult<(u16, u16, usize, bool)> {
    let header = MessageHeader::decode(bytes)?;
    Ok((
        header.message_type,
        header.sub_type,
        header.payload_length(),
        header.compressed,
    ))
}
