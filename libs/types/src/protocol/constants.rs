//! Wire header layout constants
//!
//! Every message on the wire starts with a fixed 8-byte big-endian header:
//!
//! ```text
//! byte 0-1  Message Type   (u16)
//! byte 2-3  SubType        (u16)
//! byte 4-7  Length | Flag  (u32, bit 31 = compressed, bits 0..30 = body length)
//! ```

/// Header size in bytes, independent of payload size
pub const HEADER_SIZE: usize = 8;

/// Offset of the Message Type field
pub const MESSAGE_TYPE_OFFSET: usize = 0;

/// Offset of the SubType field
pub const SUB_TYPE_OFFSET: usize = 2;

/// Offset of the packed length/flag field
pub const LENGTH_OFFSET: usize = 4;

/// Bit marking a compressed body
pub const COMPRESSED_FLAG: u32 = 0x8000_0000;

/// Mask selecting the body length from the packed field
pub const LENGTH_MASK: u32 = 0x7FFF_FFFF;

/// Largest body length the header can describe
pub const MAX_PAYLOAD_LENGTH: u32 = LENGTH_MASK;

/// SubType used by single-shape families
pub const DEFAULT_SUB_TYPE: u16 = 0;

/// Body preamble: sender protocol version (3 x u16) + sent-at timestamp (u64)
pub const PREAMBLE_SIZE: usize = 14;
