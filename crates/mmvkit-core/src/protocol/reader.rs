//! Out-of-process view of a region.
//!
//! A reader never synchronizes with the writer. It relies on the generation
//! pair instead:
//! - `gen1 != gen2`: a build is in progress, the bytes are self-inconsistent.
//! - generation differs from the one seen on the previous poll: the region
//!   was rebuilt and every cached offset may now belong to another metric.
//!
//! - generation moved while the bytes were being read: the copy may mix two
//!   layouts, so it is dropped like a mid-build one.
//!
//! All three cases surface as retryable errors (`MmvError::is_retryable`).

use std::collections::HashMap;
use std::sync::atomic::{fence, Ordering};

use serde::Serialize;

use crate::error::{MmvError, Result};
use crate::types::{MetricSemantics, MetricType};
use crate::value::Value;

use super::header::{Header, TocEntry, TocKind};
use super::records::{decode_payload, get_cstr, IndomRecord, InstanceRecord, MetricRecord, ValueRecord};
use super::{
    record, HEADER_LENGTH, INDOM_LENGTH, INSTANCE_LENGTH, METRIC_LENGTH, NO_INDOM, STRING_LENGTH,
    TOC_LENGTH, VALUE_LENGTH,
};

#[derive(Debug, Clone, Serialize)]
pub struct InstanceView {
    pub offset: u64,
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndomView {
    pub offset: u64,
    pub id: u32,
    pub instances: Vec<InstanceView>,
    pub short_help: Option<String>,
    pub long_help: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricView {
    pub offset: u64,
    pub name: String,
    pub id: u32,
    pub metric_type: MetricType,
    pub semantics: MetricSemantics,
    pub unit: u32,
    pub indom: Option<u32>,
    pub short_help: Option<String>,
    pub long_help: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValueView {
    pub offset: u64,
    pub metric: String,
    pub instance: Option<String>,
    pub value: Value,
}

/// Fully decoded, self-consistent copy of a region.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub header: Header,
    pub toc: Vec<TocEntry>,
    pub indoms: Vec<IndomView>,
    pub metrics: Vec<MetricView>,
    pub values: Vec<ValueView>,
}

impl Snapshot {
    /// Decode just the header.
    pub fn peek_header(region: &[u8]) -> Result<Header> {
        let mut buf = record(region, 0, HEADER_LENGTH)?;
        Header::decode(&mut buf)
    }

    /// Decode a whole region, rejecting it while a build is in progress or
    /// when the generation moves before the decode finishes.
    pub fn decode(region: &[u8]) -> Result<Self> {
        let header = Self::consistent_header(region)?;
        let snapshot = Self::decode_body(header, region)?;
        Self::ensure_unchanged(&header, region)?;
        Ok(snapshot)
    }

    /// Copy a live region, keeping the copy only if one generation covered
    /// the whole read.
    pub fn copy_consistent(region: &[u8]) -> Result<Vec<u8>> {
        let header = Self::consistent_header(region)?;
        fence(Ordering::Acquire);
        let copy = region.to_vec();
        Self::ensure_unchanged(&header, region)?;
        Ok(copy)
    }

    /// Fail unless `region` still carries the generation pair of `start`,
    /// the header a read began with.
    pub fn ensure_unchanged(start: &Header, region: &[u8]) -> Result<()> {
        fence(Ordering::Acquire);
        let now = Self::peek_header(region)?;
        if now.gen1 == start.gen1 && now.gen2 == start.gen2 {
            return Ok(());
        }
        tracing::debug!(
            started = start.gen1,
            gen1 = now.gen1,
            gen2 = now.gen2,
            "generation moved during read"
        );
        if now.is_consistent() {
            Err(MmvError::Regenerated {
                previous: start.gen1,
                current: now.gen1,
            })
        } else {
            Err(MmvError::Inconsistent {
                gen1: now.gen1,
                gen2: now.gen2,
            })
        }
    }

    fn consistent_header(region: &[u8]) -> Result<Header> {
        let header = Self::peek_header(region)?;
        if !header.is_consistent() {
            return Err(MmvError::Inconsistent {
                gen1: header.gen1,
                gen2: header.gen2,
            });
        }
        Ok(header)
    }

    fn decode_body(header: Header, region: &[u8]) -> Result<Self> {

        let toc_count = usize::try_from(header.toc_count)
            .map_err(|_| MmvError::InvalidFormat(format!("negative toc count {}", header.toc_count)))?;
        let mut toc = Vec::with_capacity(toc_count);
        for i in 0..toc_count {
            let offset = (HEADER_LENGTH + i * TOC_LENGTH) as u64;
            toc.push(TocEntry::decode(&mut record(region, offset, TOC_LENGTH)?)?);
        }
        let section = |kind: TocKind| toc.iter().find(|t| t.kind == kind).copied();

        let mut instances: Vec<(InstanceView, u64)> = Vec::new();
        if let Some(t) = section(TocKind::Instances) {
            for i in 0..u64::from(t.count) {
                let offset = t.offset + i * INSTANCE_LENGTH as u64;
                let rec = InstanceRecord::decode(&mut record(region, offset, INSTANCE_LENGTH)?)?;
                let view = InstanceView {
                    offset,
                    id: rec.id,
                    name: rec.name,
                };
                instances.push((view, rec.indom_offset));
            }
        }

        let mut indoms = Vec::new();
        if let Some(t) = section(TocKind::Indoms) {
            for i in 0..u64::from(t.count) {
                let offset = t.offset + i * INDOM_LENGTH as u64;
                let rec = IndomRecord::decode(&mut record(region, offset, INDOM_LENGTH)?)?;
                let members: Vec<InstanceView> = instances
                    .iter()
                    .filter(|(_, owner)| *owner == offset)
                    .map(|(view, _)| view.clone())
                    .collect();
                if members.len() != rec.count as usize {
                    return Err(MmvError::InvalidFormat(format!(
                        "indom {} declares {} instances, found {}",
                        rec.serial,
                        rec.count,
                        members.len()
                    )));
                }
                indoms.push(IndomView {
                    offset,
                    id: rec.serial,
                    instances: members,
                    short_help: read_help(region, rec.short_help_offset)?,
                    long_help: read_help(region, rec.long_help_offset)?,
                });
            }
        }

        let mut metrics = Vec::new();
        if let Some(t) = section(TocKind::Metrics) {
            for i in 0..u64::from(t.count) {
                let offset = t.offset + i * METRIC_LENGTH as u64;
                let rec = MetricRecord::decode(&mut record(region, offset, METRIC_LENGTH)?)?;
                let metric_type = MetricType::from_code(rec.type_code).ok_or_else(|| {
                    MmvError::InvalidFormat(format!("unknown metric type {}", rec.type_code))
                })?;
                let semantics = MetricSemantics::from_code(rec.semantics_code).ok_or_else(|| {
                    MmvError::InvalidFormat(format!("unknown semantics {}", rec.semantics_code))
                })?;
                metrics.push(MetricView {
                    offset,
                    name: rec.name,
                    id: rec.item,
                    metric_type,
                    semantics,
                    unit: rec.unit,
                    indom: (rec.indom != NO_INDOM).then_some(rec.indom),
                    short_help: read_help(region, rec.short_help_offset)?,
                    long_help: read_help(region, rec.long_help_offset)?,
                });
            }
        }

        let metric_at: HashMap<u64, &MetricView> = metrics.iter().map(|m| (m.offset, m)).collect();
        let instance_at: HashMap<u64, &InstanceView> =
            instances.iter().map(|(v, _)| (v.offset, v)).collect();

        let mut values = Vec::new();
        if let Some(t) = section(TocKind::Values) {
            for i in 0..u64::from(t.count) {
                let offset = t.offset + i * VALUE_LENGTH as u64;
                let rec = ValueRecord::decode(&mut record(region, offset, VALUE_LENGTH)?)?;
                let metric = metric_at.get(&rec.metric_offset).ok_or_else(|| {
                    MmvError::InvalidFormat(format!(
                        "value at {offset} references no metric ({})",
                        rec.metric_offset
                    ))
                })?;
                let instance = match rec.instance_offset {
                    0 => None,
                    at => Some(
                        instance_at
                            .get(&at)
                            .map(|v| v.name.clone())
                            .ok_or_else(|| {
                                MmvError::InvalidFormat(format!(
                                    "value at {offset} references no instance ({at})"
                                ))
                            })?,
                    ),
                };
                let value = match metric.metric_type {
                    MetricType::String => {
                        let at = u64::try_from(rec.string_offset).map_err(|_| {
                            MmvError::InvalidFormat(format!("value at {offset} has no string slot"))
                        })?;
                        Value::String(read_string(region, at)?)
                    }
                    ty => decode_payload(ty, rec.payload),
                };
                values.push(ValueView {
                    offset,
                    metric: metric.name.clone(),
                    instance,
                    value,
                });
            }
        }

        Ok(Self {
            header,
            toc,
            indoms,
            metrics,
            values,
        })
    }

    pub fn generation(&self) -> i64 {
        self.header.gen1
    }

    pub fn metric(&self, name: &str) -> Option<&MetricView> {
        self.metrics.iter().find(|m| m.name == name)
    }

    /// Current value of `metric` (and `instance`, for instance metrics).
    pub fn value(&self, metric: &str, instance: Option<&str>) -> Option<&Value> {
        self.values
            .iter()
            .find(|v| v.metric == metric && v.instance.as_deref() == instance)
            .map(|v| &v.value)
    }
}

fn read_string(region: &[u8], offset: u64) -> Result<String> {
    let mut buf = record(region, offset, STRING_LENGTH)?;
    get_cstr(&mut buf, STRING_LENGTH)
}

fn read_help(region: &[u8], offset: u64) -> Result<Option<String>> {
    match offset {
        0 => Ok(None),
        at => read_string(region, at).map(Some),
    }
}

/// Generation-aware reader state.
///
/// Remembers the generation of the last accepted snapshot; a rebuilt region
/// is reported once as `Regenerated` so callers drop anything they derived
/// from the old layout before polling again.
#[derive(Debug, Default)]
pub struct Poller {
    generation: Option<i64>,
}

impl Poller {
    pub fn new() -> Self {
        Self { generation: None }
    }

    /// Generation of the last snapshot this poller accepted or observed.
    pub fn generation(&self) -> Option<i64> {
        self.generation
    }

    pub fn poll(&mut self, region: &[u8]) -> Result<Snapshot> {
        let snapshot = match Snapshot::decode(region) {
            Ok(s) => s,
            Err(e) => {
                if e.is_retryable() {
                    tracing::debug!(error = %e, "region not readable yet");
                }
                return Err(e);
            }
        };

        let current = snapshot.generation();
        match self.generation.replace(current) {
            Some(previous) if previous != current => {
                tracing::debug!(previous, current, "region rebuilt since last poll");
                Err(MmvError::Regenerated { previous, current })
            }
            _ => Ok(snapshot),
        }
    }
}
