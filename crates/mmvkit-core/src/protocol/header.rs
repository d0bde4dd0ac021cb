//! Region header and table of contents.

use bytes::{Buf, BufMut};
use serde::Serialize;

use crate::error::{MmvError, Result};

use super::{HEADER_LENGTH, MAGIC, TOC_LENGTH, VERSION};

/// Fixed-size region header.
///
/// `gen1 == gen2` means no structural write is in progress. The writer bumps
/// `gen1` before rebuilding and copies it into `gen2` once done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Header {
    pub gen1: i64,
    pub gen2: i64,
    pub toc_count: i32,
    pub flags: u32,
    pub pid: i32,
    pub cluster: u32,
}

impl Header {
    pub fn encode<B: BufMut>(&self, out: &mut B) {
        out.put_slice(&MAGIC);
        out.put_i32_le(VERSION);
        out.put_i64_le(self.gen1);
        out.put_i64_le(self.gen2);
        out.put_i32_le(self.toc_count);
        out.put_u32_le(self.flags);
        out.put_i32_le(self.pid);
        out.put_u32_le(self.cluster);
    }

    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        if buf.remaining() < HEADER_LENGTH {
            return Err(MmvError::InvalidFormat("header too short".into()));
        }

        let mut magic = [0u8; 4];
        buf.copy_to_slice(&mut magic);
        if magic != MAGIC {
            return Err(MmvError::InvalidFormat("bad magic".into()));
        }

        let version = buf.get_i32_le();
        if version != VERSION {
            return Err(MmvError::UnsupportedVersion(version));
        }

        Ok(Self {
            gen1: buf.get_i64_le(),
            gen2: buf.get_i64_le(),
            toc_count: buf.get_i32_le(),
            flags: buf.get_u32_le(),
            pid: buf.get_i32_le(),
            cluster: buf.get_u32_le(),
        })
    }

    /// Whether the generation pair describes a finished build.
    pub fn is_consistent(&self) -> bool {
        self.gen1 == self.gen2
    }
}

/// Section tag carried by a TOC entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TocKind {
    Indoms,
    Instances,
    Metrics,
    Values,
    Strings,
}

impl TocKind {
    pub fn code(self) -> u32 {
        match self {
            TocKind::Indoms => 1,
            TocKind::Instances => 2,
            TocKind::Metrics => 3,
            TocKind::Values => 4,
            TocKind::Strings => 5,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(TocKind::Indoms),
            2 => Some(TocKind::Instances),
            3 => Some(TocKind::Metrics),
            4 => Some(TocKind::Values),
            5 => Some(TocKind::Strings),
            _ => None,
        }
    }
}

/// One table-of-contents entry: `count` records of `kind` starting at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub kind: TocKind,
    pub count: u32,
    pub offset: u64,
}

impl TocEntry {
    pub fn encode<B: BufMut>(&self, out: &mut B) {
        out.put_u32_le(self.kind.code());
        out.put_u32_le(self.count);
        out.put_u64_le(self.offset);
    }

    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        if buf.remaining() < TOC_LENGTH {
            return Err(MmvError::InvalidFormat("toc entry too short".into()));
        }
        let code = buf.get_u32_le();
        let kind = TocKind::from_code(code)
            .ok_or_else(|| MmvError::InvalidFormat(format!("unknown toc section {code}")))?;
        Ok(Self {
            kind,
            count: buf.get_u32_le(),
            offset: buf.get_u64_le(),
        })
    }
}
