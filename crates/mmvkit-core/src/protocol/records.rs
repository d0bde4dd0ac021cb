//! Fixed-size descriptor and value records.

use bytes::{Buf, BufMut};

use crate::error::{MmvError, Result};
use crate::types::MetricType;
use crate::value::Value;

use super::{INDOM_LENGTH, INSTANCE_LENGTH, METRIC_LENGTH, NAME_LENGTH, VALUE_LENGTH};

/// Write `name` NUL-padded into a `NAME_LENGTH` field.
fn put_name<B: BufMut>(out: &mut B, name: &str) -> Result<()> {
    let bytes = name.as_bytes();
    if bytes.len() >= NAME_LENGTH {
        return Err(MmvError::NameTooLong {
            len: bytes.len(),
            max: NAME_LENGTH - 1,
        });
    }
    out.put_slice(bytes);
    out.put_bytes(0, NAME_LENGTH - bytes.len());
    Ok(())
}

/// Read a NUL-terminated string out of a fixed-size field.
pub(crate) fn get_cstr<B: Buf>(buf: &mut B, len: usize) -> Result<String> {
    if buf.remaining() < len {
        return Err(MmvError::InvalidFormat("string field too short".into()));
    }
    let mut raw = vec![0u8; len];
    buf.copy_to_slice(&mut raw);
    let end = raw.iter().position(|b| *b == 0).unwrap_or(len);
    raw.truncate(end);
    String::from_utf8(raw).map_err(|e| MmvError::InvalidFormat(format!("non utf-8 string: {e}")))
}

fn ensure<B: Buf>(buf: &B, len: usize, what: &str) -> Result<()> {
    if buf.remaining() < len {
        return Err(MmvError::InvalidFormat(format!("{what} record too short")));
    }
    Ok(())
}

/// Instance domain record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndomRecord {
    pub serial: u32,
    pub count: u32,
    pub instances_offset: u64,
    pub short_help_offset: u64,
    pub long_help_offset: u64,
}

impl IndomRecord {
    pub fn encode<B: BufMut>(&self, out: &mut B) {
        out.put_u32_le(self.serial);
        out.put_u32_le(self.count);
        out.put_u64_le(self.instances_offset);
        out.put_u64_le(self.short_help_offset);
        out.put_u64_le(self.long_help_offset);
    }

    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        ensure(buf, INDOM_LENGTH, "indom")?;
        Ok(Self {
            serial: buf.get_u32_le(),
            count: buf.get_u32_le(),
            instances_offset: buf.get_u64_le(),
            short_help_offset: buf.get_u64_le(),
            long_help_offset: buf.get_u64_le(),
        })
    }
}

/// Instance record; points back at its domain record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    pub indom_offset: u64,
    pub id: u32,
    pub name: String,
}

impl InstanceRecord {
    pub fn encode<B: BufMut>(&self, out: &mut B) -> Result<()> {
        out.put_u64_le(self.indom_offset);
        out.put_u32_le(0); // padding
        out.put_u32_le(self.id);
        put_name(out, &self.name)
    }

    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        ensure(buf, INSTANCE_LENGTH, "instance")?;
        let indom_offset = buf.get_u64_le();
        buf.advance(4);
        let id = buf.get_u32_le();
        let name = get_cstr(buf, NAME_LENGTH)?;
        Ok(Self {
            indom_offset,
            id,
            name,
        })
    }
}

/// Metric descriptor record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRecord {
    pub name: String,
    pub item: u32,
    pub type_code: i32,
    pub semantics_code: i32,
    pub unit: u32,
    pub indom: u32,
    pub short_help_offset: u64,
    pub long_help_offset: u64,
}

impl MetricRecord {
    pub fn encode<B: BufMut>(&self, out: &mut B) -> Result<()> {
        put_name(out, &self.name)?;
        out.put_u32_le(self.item);
        out.put_i32_le(self.type_code);
        out.put_i32_le(self.semantics_code);
        out.put_u32_le(self.unit);
        out.put_u32_le(self.indom);
        out.put_u32_le(0); // padding
        out.put_u64_le(self.short_help_offset);
        out.put_u64_le(self.long_help_offset);
        Ok(())
    }

    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        ensure(buf, METRIC_LENGTH, "metric")?;
        let name = get_cstr(buf, NAME_LENGTH)?;
        let item = buf.get_u32_le();
        let type_code = buf.get_i32_le();
        let semantics_code = buf.get_i32_le();
        let unit = buf.get_u32_le();
        let indom = buf.get_u32_le();
        buf.advance(4);
        Ok(Self {
            name,
            item,
            type_code,
            semantics_code,
            unit,
            indom,
            short_help_offset: buf.get_u64_le(),
            long_help_offset: buf.get_u64_le(),
        })
    }
}

/// Value record. `payload` holds numeric values in place; string values live
/// in the string section at `string_offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueRecord {
    pub payload: [u8; 8],
    pub string_offset: i64,
    pub metric_offset: u64,
    pub instance_offset: u64,
}

impl ValueRecord {
    pub fn encode<B: BufMut>(&self, out: &mut B) {
        out.put_slice(&self.payload);
        out.put_i64_le(self.string_offset);
        out.put_u64_le(self.metric_offset);
        out.put_u64_le(self.instance_offset);
    }

    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        ensure(buf, VALUE_LENGTH, "value")?;
        let mut payload = [0u8; 8];
        buf.copy_to_slice(&mut payload);
        Ok(Self {
            payload,
            string_offset: buf.get_i64_le(),
            metric_offset: buf.get_u64_le(),
            instance_offset: buf.get_u64_le(),
        })
    }
}

/// Encode a numeric value into the 8-byte payload (zero for strings).
pub fn encode_payload(val: &Value) -> [u8; 8] {
    let mut out = [0u8; 8];
    let mut dst = &mut out[..];
    match val {
        Value::Int32(v) => dst.put_i32_le(*v),
        Value::Uint32(v) => dst.put_u32_le(*v),
        Value::Int64(v) => dst.put_i64_le(*v),
        Value::Uint64(v) => dst.put_u64_le(*v),
        Value::Float(v) => dst.put_f32_le(*v),
        Value::Double(v) => dst.put_f64_le(*v),
        Value::Int(v) => dst.put_i64_le(*v as i64),
        Value::Uint(v) => dst.put_u64_le(*v as u64),
        Value::String(_) => {}
    }
    out
}

/// Decode a numeric payload of type `ty`. Strings are resolved by the caller.
pub fn decode_payload(ty: MetricType, payload: [u8; 8]) -> Value {
    let mut src = &payload[..];
    match ty {
        MetricType::Int32 => Value::Int32(src.get_i32_le()),
        MetricType::Uint32 => Value::Uint32(src.get_u32_le()),
        MetricType::Int64 => Value::Int64(src.get_i64_le()),
        MetricType::Uint64 => Value::Uint64(src.get_u64_le()),
        MetricType::Float => Value::Float(src.get_f32_le()),
        MetricType::Double => Value::Double(src.get_f64_le()),
        MetricType::String => Value::String(String::new()),
    }
}
