//! Layout engine: assigns every record an offset and serializes the structure.
//!
//! Section order is fixed: header, TOC, instance domains, instances, metrics,
//! values, strings. String slots are handed out in this order: domain help
//! texts, metric help texts, then one slot per string-typed value.
//!
//! Value payloads are not written here. Each value record is paired with a
//! [`Binding`] that attaches the owning container to its slot; attaching
//! writes the container's current value.

use std::collections::HashMap;
use std::sync::Arc;

use mmvkit_core::error::{MmvError, Result};
use mmvkit_core::protocol::{
    ByteWriter, Header, IndomRecord, InstanceRecord, MetricRecord, TocEntry, TocKind, ValueRecord,
    ValueSlot, HEADER_LENGTH, INDOM_LENGTH, INSTANCE_LENGTH, MAX_STRING_LENGTH, METRIC_LENGTH,
    NO_INDOM, STRING_LENGTH, TOC_LENGTH, VALUE_LENGTH,
};
use mmvkit_core::MetricType;

use crate::hook::{UpdateHook, ValueSink};
use crate::indom::InstanceDomain;
use crate::metric::{InstanceMetric, Metric, MetricHandle, SingletonMetric};

/// Container side of one value record.
#[derive(Debug, Clone)]
pub enum BindTarget {
    Singleton(Arc<SingletonMetric>),
    Instance(Arc<InstanceMetric>, String),
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub target: BindTarget,
    pub slot: ValueSlot,
}

impl Binding {
    /// Attach the container to `sink` at this binding's slot.
    pub fn attach(&self, sink: Arc<dyn ValueSink>) -> Result<()> {
        let hook = UpdateHook::new(sink, self.slot);
        match &self.target {
            BindTarget::Singleton(m) => m.attach(hook),
            BindTarget::Instance(m, instance) => m.attach_instance(instance, hook),
        }
    }

    pub fn name(&self) -> String {
        match &self.target {
            BindTarget::Singleton(m) => m.name().to_owned(),
            BindTarget::Instance(m, instance) => {
                format!("{}[{instance}]", m.name())
            }
        }
    }
}

/// Offsets of every section plus the records that go into them.
#[derive(Debug)]
pub struct Layout {
    size: usize,
    toc: Vec<TocEntry>,
    indoms: Vec<(usize, IndomRecord)>,
    instances: Vec<(usize, InstanceRecord)>,
    metrics: Vec<(usize, MetricRecord)>,
    values: Vec<(usize, ValueRecord)>,
    strings: Vec<(usize, String)>,
    bindings: Vec<Binding>,
}

/// Sequential string slot allocator.
struct StringTable {
    next: usize,
    texts: Vec<(usize, String)>,
}

impl StringTable {
    fn new(base: usize) -> Self {
        Self {
            next: base,
            texts: Vec::new(),
        }
    }

    /// Slot for a help text; empty texts get none (offset 0).
    fn help(&mut self, owner: &str, text: &str) -> Result<u64> {
        if text.is_empty() {
            return Ok(0);
        }
        if text.len() > MAX_STRING_LENGTH {
            return Err(MmvError::RegionBuild(format!(
                "help text of {owner} is {} bytes, at most {MAX_STRING_LENGTH} allowed",
                text.len()
            )));
        }
        let at = self.slot();
        self.texts.push((at, text.to_owned()));
        Ok(at as u64)
    }

    fn slot(&mut self) -> usize {
        let at = self.next;
        self.next += STRING_LENGTH;
        at
    }
}

impl Layout {
    /// Plan a region for `domains` and `metrics`, both in registration order.
    pub fn plan(domains: &[Arc<InstanceDomain>], metrics: &[MetricHandle]) -> Result<Self> {
        let members: Vec<_> = domains.iter().map(|d| d.instances()).collect();
        let instance_total: usize = members.iter().map(Vec::len).sum();

        let mut value_rows: Vec<(&MetricHandle, Option<String>)> = Vec::new();
        for metric in metrics {
            match metric {
                MetricHandle::Singleton(_) => value_rows.push((metric, None)),
                MetricHandle::Instance(m) => {
                    value_rows.extend(m.instances().into_iter().map(|i| (metric, Some(i))));
                }
            }
        }

        let help_texts: usize = domains
            .iter()
            .map(|d| [d.short_help(), d.long_help()])
            .chain(metrics.iter().map(|m| {
                let desc = m.desc();
                [desc.short_description(), desc.long_description()]
            }))
            .flatten()
            .filter(|text| !text.is_empty())
            .count();
        let string_values = value_rows
            .iter()
            .filter(|(m, _)| m.desc().metric_type() == MetricType::String)
            .count();
        let string_count = help_texts + string_values;

        let mut toc_count = 2;
        if !domains.is_empty() {
            toc_count += 2;
        }
        if string_count > 0 {
            toc_count += 1;
        }

        let indoms_at = HEADER_LENGTH + toc_count * TOC_LENGTH;
        let instances_at = indoms_at + domains.len() * INDOM_LENGTH;
        let metrics_at = instances_at + instance_total * INSTANCE_LENGTH;
        let values_at = metrics_at + metrics.len() * METRIC_LENGTH;
        let strings_at = values_at + value_rows.len() * VALUE_LENGTH;
        let mut strings = StringTable::new(strings_at);

        let mut indom_records = Vec::with_capacity(domains.len());
        let mut instance_records = Vec::with_capacity(instance_total);
        let mut instance_offsets: HashMap<(u32, String), usize> = HashMap::new();
        let mut next_instance = instances_at;
        for (i, (domain, members)) in domains.iter().zip(&members).enumerate() {
            let at = indoms_at + i * INDOM_LENGTH;
            let first = next_instance;
            for instance in members {
                instance_records.push((
                    next_instance,
                    InstanceRecord {
                        indom_offset: at as u64,
                        id: instance.id(),
                        name: instance.name().to_owned(),
                    },
                ));
                instance_offsets.insert((domain.id(), instance.name().to_owned()), next_instance);
                next_instance += INSTANCE_LENGTH;
            }
            let owner = format!("instance domain {}", domain.name());
            indom_records.push((
                at,
                IndomRecord {
                    serial: domain.id(),
                    count: count_u32(members.len())?,
                    instances_offset: if members.is_empty() { 0 } else { first as u64 },
                    short_help_offset: strings.help(&owner, domain.short_help())?,
                    long_help_offset: strings.help(&owner, domain.long_help())?,
                },
            ));
        }

        let mut metric_records = Vec::with_capacity(metrics.len());
        let mut metric_offsets: HashMap<u32, usize> = HashMap::new();
        for (i, metric) in metrics.iter().enumerate() {
            let at = metrics_at + i * METRIC_LENGTH;
            let desc = metric.desc();
            let owner = format!("metric {}", desc.name());
            metric_records.push((
                at,
                MetricRecord {
                    name: desc.name().to_owned(),
                    item: desc.id(),
                    type_code: desc.metric_type().code(),
                    semantics_code: desc.semantics().code(),
                    unit: desc.unit().pmapi(),
                    indom: metric.indom().map_or(NO_INDOM, |d| d.id()),
                    short_help_offset: strings.help(&owner, desc.short_description())?,
                    long_help_offset: strings.help(&owner, desc.long_description())?,
                },
            ));
            metric_offsets.insert(desc.id(), at);
        }

        let mut value_records = Vec::with_capacity(value_rows.len());
        let mut bindings = Vec::with_capacity(value_rows.len());
        for (i, (metric, instance)) in value_rows.into_iter().enumerate() {
            let at = values_at + i * VALUE_LENGTH;
            let desc = metric.desc();
            let metric_offset = metric_offsets.get(&desc.id()).copied().ok_or_else(|| {
                MmvError::RegionBuild(format!("metric {} has no descriptor record", desc.name()))
            })?;
            let string_offset =
                (desc.metric_type() == MetricType::String).then(|| strings.slot());

            let (instance_offset, target) = match (metric, instance) {
                (MetricHandle::Singleton(m), _) => (0, BindTarget::Singleton(Arc::clone(m))),
                (MetricHandle::Instance(m), Some(name)) => {
                    let indom = m.domain().id();
                    let offset = instance_offsets.get(&(indom, name.clone())).copied().ok_or_else(
                        || {
                            MmvError::RegionBuild(format!(
                                "instance {name} of {} is not laid out",
                                desc.name()
                            ))
                        },
                    )?;
                    (offset as u64, BindTarget::Instance(Arc::clone(m), name))
                }
                (MetricHandle::Instance(_), None) => {
                    return Err(MmvError::RegionBuild(format!(
                        "instance metric {} has a value without an instance",
                        desc.name()
                    )))
                }
            };

            value_records.push((
                at,
                ValueRecord {
                    payload: [0; 8],
                    string_offset: string_offset.map_or(0, |s| s as i64),
                    metric_offset: metric_offset as u64,
                    instance_offset,
                },
            ));
            bindings.push(Binding {
                target,
                slot: ValueSlot {
                    value_offset: at,
                    string_offset,
                },
            });
        }

        let mut toc = Vec::with_capacity(toc_count);
        if !domains.is_empty() {
            toc.push(toc_entry(TocKind::Indoms, domains.len(), indoms_at)?);
            toc.push(toc_entry(TocKind::Instances, instance_total, instances_at)?);
        }
        toc.push(toc_entry(TocKind::Metrics, metrics.len(), metrics_at)?);
        toc.push(toc_entry(TocKind::Values, value_records.len(), values_at)?);
        if string_count > 0 {
            toc.push(toc_entry(TocKind::Strings, string_count, strings_at)?);
        }

        Ok(Self {
            size: strings.next,
            toc,
            indoms: indom_records,
            instances: instance_records,
            metrics: metric_records,
            values: value_records,
            strings: strings.texts,
            bindings,
        })
    }

    /// Total region size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn toc_count(&self) -> i32 {
        // at most five sections
        self.toc.len() as i32
    }

    pub fn toc(&self) -> &[TocEntry] {
        &self.toc
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Serialize header, TOC, domains, instances, metrics, value records and
    /// help strings into `buf`. Value payloads stay zero until bound.
    pub fn write(&self, buf: &mut [u8], header: &Header) -> Result<()> {
        header.encode(&mut window(buf, 0, HEADER_LENGTH)?);
        for (i, entry) in self.toc.iter().enumerate() {
            entry.encode(&mut window(buf, HEADER_LENGTH + i * TOC_LENGTH, TOC_LENGTH)?);
        }
        for (at, rec) in &self.indoms {
            rec.encode(&mut window(buf, *at, INDOM_LENGTH)?);
        }
        for (at, rec) in &self.instances {
            rec.encode(&mut window(buf, *at, INSTANCE_LENGTH)?)?;
        }
        for (at, rec) in &self.metrics {
            rec.encode(&mut window(buf, *at, METRIC_LENGTH)?)?;
        }
        for (at, rec) in &self.values {
            rec.encode(&mut window(buf, *at, VALUE_LENGTH)?);
        }
        for (at, text) in &self.strings {
            buf.write_string(text, *at)?;
        }
        Ok(())
    }
}

/// Exactly `len` writable bytes at `offset`.
fn window(buf: &mut [u8], offset: usize, len: usize) -> Result<&mut [u8]> {
    let size = buf.len();
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(&mut buf[offset..end]),
        _ => Err(MmvError::OutOfBounds { offset, len, size }),
    }
}

fn count_u32(n: usize) -> Result<u32> {
    u32::try_from(n).map_err(|_| MmvError::RegionBuild(format!("section of {n} records")))
}

fn toc_entry(kind: TocKind, count: usize, offset: usize) -> Result<TocEntry> {
    Ok(TocEntry {
        kind,
        count: count_u32(count)?,
        offset: offset as u64,
    })
}
