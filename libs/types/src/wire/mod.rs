//! Field-level Wire Codec
//!
//! Payload bodies are a flat sequence of fields written in declaration order.
//! This module provides the cursor types used to produce and consume them.
//!
//! ## Encoding Rules
//!
//! - Integers and floats: big-endian, fixed width
//! - `bool`: one byte, `0` or `1`; any other value is rejected
//! - Strings: `u32` byte length followed by UTF-8 bytes
//! - Sequences: `u32` element count followed by the elements
//! - UUIDs: 16 raw bytes
//! - Fixed arrays: their elements, no count
//!
//! The field order of a payload shape is the wire contract for its SubType
//! and must never change for an existing shape.
//!
//! ## Allocation Behaviour
//!
//! Reads decode *into* an existing value. Strings and vectors are cleared and
//! refilled, keeping their capacity, so a pooled payload reaches a steady state
//! where decoding allocates nothing.

mod field;
mod reader;
mod writer;

pub use field::WireField;
pub use reader::WireReader;
pub use writer::WireWriter;

use thiserror::Error;

/// Field encode/decode failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Input ended before the field was complete
    #[error("Truncated field: need {needed} bytes at offset {offset}, {remaining} remaining")]
    Truncated {
        needed: usize,
        offset: usize,
        remaining: usize,
    },

    /// Boolean byte other than 0 or 1
    #[error("Invalid boolean byte {value:#04x} at offset {offset}")]
    InvalidBool { value: u8, offset: usize },

    /// String bytes are not UTF-8
    #[error("Invalid UTF-8 in string field at offset {offset}")]
    InvalidUtf8 { offset: usize },

    /// Length or count does not fit its `u32` prefix
    #[error("Length {length} exceeds wire limit {limit}")]
    LengthOverflow { length: usize, limit: usize },

    /// Underlying buffer rejected the write
    #[error("Write failed: {message}")]
    Io { message: String },
}

impl WireError {
    pub fn truncated(needed: usize, offset: usize, remaining: usize) -> Self {
        Self::Truncated {
            needed,
            offset,
            remaining,
        }
    }
}

impl From<std::io::Error> for WireError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

/// Ordered field layout of one payload shape
///
/// Implemented by every generated payload struct and by the family and
/// top-level payload enums, which delegate to the active shape.
pub trait PayloadFields {
    /// Append all fields in declaration order
    fn write_fields(&self, writer: &mut WireWriter<'_>) -> Result<(), WireError>;

    /// Overwrite all fields from `reader`, in the same order
    fn read_fields(&mut self, reader: &mut WireReader<'_>) -> Result<(), WireError>;

    /// Return every field to its default, keeping allocated capacity
    fn reset(&mut self);
}
