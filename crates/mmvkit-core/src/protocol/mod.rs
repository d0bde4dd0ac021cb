//! Binary region format.
//!
//! A region is one contiguous little-endian byte range:
//! header, table of contents, then the instance domain, instance, metric,
//! value and string sections, each an array of fixed-size records.
//!
//! Decoders are panic-free: every record is sliced out with a bounds check
//! and read through `bytes::Buf`, so a truncated or foreign region is reported
//! as `MmvError::InvalidFormat` instead of crashing the reader.

pub mod header;
pub mod reader;
pub mod records;
pub mod writer;

pub use header::{Header, TocEntry, TocKind};
pub use reader::{Poller, Snapshot};
pub use records::{IndomRecord, InstanceRecord, MetricRecord, ValueRecord};
pub use writer::{ByteWriter, ValueSlot};

/// Region magic.
pub const MAGIC: [u8; 4] = *b"MMV\0";
/// Region format version.
pub const VERSION: i32 = 1;

pub const HEADER_LENGTH: usize = 40;
pub const TOC_LENGTH: usize = 16;
pub const INDOM_LENGTH: usize = 32;
pub const INSTANCE_LENGTH: usize = 80;
pub const METRIC_LENGTH: usize = 104;
pub const VALUE_LENGTH: usize = 32;
pub const STRING_LENGTH: usize = 256;

/// Inline capacity of metric and instance names, NUL terminator included.
pub const NAME_LENGTH: usize = 64;
/// Longest name a record can hold.
pub const MAX_NAME_LENGTH: usize = NAME_LENGTH - 1;
/// Longest string a string slot can hold.
pub const MAX_STRING_LENGTH: usize = STRING_LENGTH - 1;

/// Byte offset of `gen1` in the header.
pub const GEN1_OFFSET: usize = 8;
/// Byte offset of `gen2` in the header.
pub const GEN2_OFFSET: usize = 16;

/// `indom` field of a metric without an instance domain.
pub const NO_INDOM: u32 = u32::MAX;

/// Header flag: monitor should not prefix metric names with the region name.
pub const FLAG_NO_PREFIX: u32 = 0x1;
/// Header flag: values are only meaningful while `pid` is alive.
pub const FLAG_PROCESS: u32 = 0x2;
/// Header flag: monitor should flag values as missing once `pid` exits.
pub const FLAG_SENTINEL: u32 = 0x4;

/// Slice `len` bytes at `offset` out of `region`, or fail with `InvalidFormat`.
pub(crate) fn record(region: &[u8], offset: u64, len: usize) -> crate::Result<&[u8]> {
    usize::try_from(offset)
        .ok()
        .and_then(|start| region.get(start..start.checked_add(len)?))
        .ok_or_else(|| {
            crate::MmvError::InvalidFormat(format!(
                "record of {len} bytes at offset {offset} outside region of {} bytes",
                region.len()
            ))
        })
}
