//! Byte-level writes into a region buffer.

use crate::error::{MmvError, Result};
use crate::value::Value;

use super::records::encode_payload;
use super::{MAX_STRING_LENGTH, STRING_LENGTH};

/// Encodes values and raw bytes at absolute offsets of a buffer.
pub trait ByteWriter {
    /// Write `bytes` at `offset`, returning the number of bytes written.
    fn write_bytes(&mut self, bytes: &[u8], offset: usize) -> Result<usize>;

    /// Zero `len` bytes at `offset`.
    fn zero(&mut self, offset: usize, len: usize) -> Result<usize>;

    /// Encode a typed value at `offset`. Numbers take their natural width,
    /// strings are written as raw bytes without padding.
    fn write_val(&mut self, val: &Value, offset: usize) -> Result<usize> {
        match val {
            Value::String(s) => self.write_bytes(s.as_bytes(), offset),
            Value::Int32(_) | Value::Uint32(_) | Value::Float(_) => {
                let payload = encode_payload(val);
                self.write_bytes(&payload[..4], offset)
            }
            _ => self.write_bytes(&encode_payload(val), offset),
        }
    }

    /// Replace the string slot at `offset`: the slot is zeroed first so a
    /// shorter string leaves no trailing bytes of the previous one.
    fn write_string(&mut self, s: &str, offset: usize) -> Result<usize> {
        if s.len() > MAX_STRING_LENGTH {
            return Err(MmvError::StringTooLong {
                len: s.len(),
                max: MAX_STRING_LENGTH,
            });
        }
        self.zero(offset, STRING_LENGTH)?;
        self.write_bytes(s.as_bytes(), offset)
    }
}

impl ByteWriter for [u8] {
    fn write_bytes(&mut self, bytes: &[u8], offset: usize) -> Result<usize> {
        let size = self.len();
        let end = offset
            .checked_add(bytes.len())
            .filter(|end| *end <= size)
            .ok_or(MmvError::OutOfBounds {
                offset,
                len: bytes.len(),
                size,
            })?;
        self[offset..end].copy_from_slice(bytes);
        Ok(bytes.len())
    }

    fn zero(&mut self, offset: usize, len: usize) -> Result<usize> {
        let size = self.len();
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= size)
            .ok_or(MmvError::OutOfBounds { offset, len, size })?;
        self[offset..end].fill(0);
        Ok(len)
    }
}

/// Where one published value lives inside the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueSlot {
    /// Offset of the value record.
    pub value_offset: usize,
    /// Offset of the string slot for string-typed metrics.
    pub string_offset: Option<usize>,
}

impl ValueSlot {
    /// Write `val` into this slot.
    pub fn write<W: ByteWriter + ?Sized>(&self, w: &mut W, val: &Value) -> Result<usize> {
        match (val, self.string_offset) {
            (Value::String(s), Some(offset)) => w.write_string(s, offset),
            (Value::String(_), None) => Err(MmvError::InvalidFormat(format!(
                "value record at {} has no string slot",
                self.value_offset
            ))),
            _ => w.write_val(val, self.value_offset),
        }
    }
}
