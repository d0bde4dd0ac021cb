//! Registry: owns the registered domains and metrics and the live region.
//!
//! Lifecycle:
//! - accepting: domains, instances and metrics may be registered.
//! - live (after `start`): the region is mapped and every container writes
//!   through to it. Structural changes fail with `AlreadyStarted`.
//! - `stop` unbinds everything and returns to accepting; the next `start`
//!   rebuilds under a strictly greater generation into a fresh file that
//!   replaces the old one by rename.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use parking_lot::Mutex;

use mmvkit_core::error::{MmvError, Result};
use mmvkit_core::hash::hash;
use mmvkit_core::protocol::Header;
use mmvkit_core::{MetricSemantics, MetricType, MetricUnit, Value};

use crate::config::RegistrySection;
use crate::hook::ValueSink;
use crate::indom::InstanceDomain;
use crate::layout::Layout;
use crate::metric::{Counter, InstanceMetric, Instances, MetricHandle, SingletonMetric};
use crate::region::Region;

struct Entry<T> {
    item: T,
    created_seq: u64,
}

enum Phase {
    Accepting,
    Live(Arc<Region>),
}

struct Lifecycle {
    phase: Phase,
    generation: i64,
}

/// Where the region goes.
#[derive(Debug, Clone)]
enum Placement {
    File(RegistrySection),
    Memory(RegistrySection),
}

impl Placement {
    fn section(&self) -> &RegistrySection {
        match self {
            Self::File(s) | Self::Memory(s) => s,
        }
    }
}

pub struct Registry {
    placement: Placement,
    indoms: DashMap<u32, Entry<Arc<InstanceDomain>>>,
    metrics: DashMap<u32, Entry<MetricHandle>>,
    seq: AtomicU64,
    life: Mutex<Lifecycle>,
}

impl Registry {
    /// File-backed registry publishing at `section.path()`.
    pub fn new(section: RegistrySection) -> Result<Self> {
        section.validate()?;
        Ok(Self::with_placement(Placement::File(section)))
    }

    /// Registry backed by an anonymous mapping; inspect it with `region_bytes`.
    pub fn in_memory(name: &str) -> Result<Self> {
        let section = RegistrySection::new(name);
        section.validate()?;
        Ok(Self::with_placement(Placement::Memory(section)))
    }

    fn with_placement(placement: Placement) -> Self {
        Self {
            placement,
            indoms: DashMap::new(),
            metrics: DashMap::new(),
            seq: AtomicU64::new(1),
            life: Mutex::new(Lifecycle {
                phase: Phase::Accepting,
                generation: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.placement.section().name
    }

    /// Region file path; `None` for in-memory registries.
    pub fn path(&self) -> Option<PathBuf> {
        match &self.placement {
            Placement::File(s) => Some(s.path()),
            Placement::Memory(_) => None,
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self.life.lock().phase, Phase::Live(_))
    }

    /// Generation of the live region.
    pub fn generation(&self) -> Option<i64> {
        let life = self.life.lock();
        match life.phase {
            Phase::Live(_) => Some(life.generation),
            Phase::Accepting => None,
        }
    }

    /// Copy of the live region's bytes.
    pub fn region_bytes(&self) -> Option<Vec<u8>> {
        match &self.life.lock().phase {
            Phase::Live(region) => Some(region.to_vec()),
            Phase::Accepting => None,
        }
    }

    pub fn instance_domain_count(&self) -> usize {
        self.indoms.len()
    }

    pub fn metric_count(&self) -> usize {
        self.metrics.len()
    }

    pub fn value_count(&self) -> usize {
        self.metrics
            .iter()
            .map(|e| match &e.value().item {
                MetricHandle::Singleton(_) => 1,
                MetricHandle::Instance(m) => m.instances().len(),
            })
            .sum()
    }

    fn ensure_accepting(&self) -> Result<()> {
        match self.life.lock().phase {
            Phase::Accepting => Ok(()),
            Phase::Live(_) => Err(MmvError::AlreadyStarted),
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Create a domain, or return the one already registered under `name`.
    ///
    /// Help texts of a repeated call are ignored.
    pub fn new_instance_domain(
        &self,
        name: &str,
        short_help: &str,
        long_help: &str,
    ) -> Result<Arc<InstanceDomain>> {
        let id = hash(name, 0);
        if let Some(existing) = self.indoms.get(&id) {
            return same_domain(&existing.item, name);
        }
        self.ensure_accepting()?;

        let created_seq = self.next_seq();
        let entry = self.indoms.entry(id).or_insert_with(|| Entry {
            item: Arc::new(InstanceDomain::new(name, short_help, long_help)),
            created_seq,
        });
        let domain = same_domain(&entry.item, name)?;
        drop(entry);
        tracing::debug!(indom = name, id, "instance domain registered");
        Ok(domain)
    }

    /// Register a domain built outside this registry.
    pub fn register_instance_domain(&self, domain: &Arc<InstanceDomain>) -> Result<()> {
        if let Some(existing) = self.indoms.get(&domain.id()) {
            if Arc::ptr_eq(&existing.item, domain) {
                return Ok(());
            }
            return Err(MmvError::IdCollision {
                name: domain.name().to_owned(),
                existing: existing.item.name().to_owned(),
                id: domain.id(),
            });
        }
        self.ensure_accepting()?;

        let created_seq = self.next_seq();
        self.indoms.insert(
            domain.id(),
            Entry {
                item: Arc::clone(domain),
                created_seq,
            },
        );
        tracing::debug!(indom = domain.name(), id = domain.id(), "instance domain registered");
        Ok(())
    }

    /// Register a metric container; instance metrics bring their domain along.
    ///
    /// Registering the same container twice is a no-op.
    pub fn register(&self, metric: impl Into<MetricHandle>) -> Result<()> {
        let metric = metric.into();
        self.ensure_accepting()?;

        let id = metric.desc().id();
        if let Some(existing) = self.metrics.get(&id) {
            if existing.item.same_as(&metric) {
                return Ok(());
            }
            return Err(MmvError::IdCollision {
                name: metric.desc().name().to_owned(),
                existing: existing.item.desc().name().to_owned(),
                id,
            });
        }
        if let Some(domain) = metric.indom() {
            self.register_instance_domain(domain)?;
        }

        let created_seq = self.next_seq();
        let name = metric.desc().name().to_owned();
        self.metrics.insert(
            id,
            Entry {
                item: metric,
                created_seq,
            },
        );
        tracing::debug!(metric = %name, id, "metric registered");
        Ok(())
    }

    pub fn new_singleton_metric(
        &self,
        value: impl Into<Value>,
        name: &str,
        metric_type: MetricType,
        semantics: MetricSemantics,
        unit: impl Into<MetricUnit>,
        descriptions: &[&str],
    ) -> Result<Arc<SingletonMetric>> {
        self.ensure_accepting()?;
        let metric = Arc::new(SingletonMetric::new(
            value,
            name,
            metric_type,
            semantics,
            unit,
            descriptions,
        )?);
        self.register(Arc::clone(&metric))?;
        Ok(metric)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new_instance_metric(
        &self,
        values: Instances,
        name: &str,
        indom: &Arc<InstanceDomain>,
        metric_type: MetricType,
        semantics: MetricSemantics,
        unit: impl Into<MetricUnit>,
        descriptions: &[&str],
    ) -> Result<Arc<InstanceMetric>> {
        self.ensure_accepting()?;
        let metric = Arc::new(InstanceMetric::new(
            values,
            name,
            indom,
            metric_type,
            semantics,
            unit,
            descriptions,
        )?);
        self.register(Arc::clone(&metric))?;
        Ok(metric)
    }

    pub fn new_counter(&self, val: i64, name: &str, descriptions: &[&str]) -> Result<Arc<Counter>> {
        self.ensure_accepting()?;
        let counter = Arc::new(Counter::new(val, name, descriptions)?);
        self.register(&counter)?;
        Ok(counter)
    }

    fn ordered_domains(&self) -> Vec<Arc<InstanceDomain>> {
        let mut all: Vec<(u64, Arc<InstanceDomain>)> = self
            .indoms
            .iter()
            .map(|e| (e.value().created_seq, Arc::clone(&e.value().item)))
            .collect();
        all.sort_by_key(|(seq, _)| *seq);
        all.into_iter().map(|(_, d)| d).collect()
    }

    fn ordered_metrics(&self) -> Vec<MetricHandle> {
        let mut all: Vec<(u64, MetricHandle)> = self
            .metrics
            .iter()
            .map(|e| (e.value().created_seq, e.value().item.clone()))
            .collect();
        all.sort_by_key(|(seq, _)| *seq);
        all.into_iter().map(|(_, m)| m).collect()
    }

    /// Lay out every registered domain and metric, map the region and go live.
    pub fn start(&self) -> Result<()> {
        let mut life = self.life.lock();
        if matches!(life.phase, Phase::Live(_)) {
            return Err(MmvError::AlreadyStarted);
        }

        let domains = self.ordered_domains();
        let metrics = self.ordered_metrics();
        for domain in &domains {
            domain.seal();
        }

        let generation = next_generation(life.generation);
        match self.build(&domains, &metrics, generation) {
            Ok(region) => {
                tracing::info!(
                    registry = self.name(),
                    path = ?region.path(),
                    generation,
                    bytes = region.len(),
                    indoms = domains.len(),
                    metrics = metrics.len(),
                    "region published"
                );
                life.generation = generation;
                life.phase = Phase::Live(region);
                Ok(())
            }
            Err(e) => {
                for metric in &metrics {
                    metric.detach();
                }
                for domain in &domains {
                    domain.unseal();
                }
                tracing::warn!(registry = self.name(), error = %e, "region build failed");
                Err(e)
            }
        }
    }

    fn build(
        &self,
        domains: &[Arc<InstanceDomain>],
        metrics: &[MetricHandle],
        generation: i64,
    ) -> Result<Arc<Region>> {
        let layout = Layout::plan(domains, metrics)?;
        let section = self.placement.section();
        let region = Arc::new(match &self.placement {
            Placement::File(s) => Region::create(&s.path(), layout.size())?,
            Placement::Memory(_) => Region::anonymous(layout.size())?,
        });

        let header = Header {
            gen1: generation,
            gen2: 0,
            toc_count: layout.toc_count(),
            flags: section.flags.bits(),
            pid: std::process::id() as i32,
            cluster: section.cluster(),
        };

        let result = (|| {
            region.with_bytes(|buf| layout.write(buf, &header))?;
            let sink: Arc<dyn ValueSink> = region.clone();
            for binding in layout.bindings() {
                binding.attach(Arc::clone(&sink)).map_err(|e| {
                    MmvError::RegionBuild(format!("value of {}: {e}", binding.name()))
                })?;
            }
            region.publish_generation(generation)?;
            region.flush()?;
            region.install()
        })();

        match result {
            Ok(()) => Ok(region),
            Err(e) => {
                // an earlier generation at the path, if any, stays in place
                if let Err(cleanup) = region.discard() {
                    tracing::warn!(error = %cleanup, "failed to remove staged region");
                }
                Err(e)
            }
        }
    }

    /// Unbind every container and release the region. Stopping an idle
    /// registry is a no-op.
    pub fn stop(&self) -> Result<()> {
        let mut life = self.life.lock();
        let Phase::Live(region) = std::mem::replace(&mut life.phase, Phase::Accepting) else {
            return Ok(());
        };

        for entry in self.metrics.iter() {
            entry.value().item.detach();
        }
        for entry in self.indoms.iter() {
            entry.value().item.unseal();
        }

        let flushed = region.flush();
        let removed = if self.placement.section().remove_on_stop {
            region.remove_file()
        } else {
            Ok(())
        };
        tracing::info!(
            registry = self.name(),
            generation = life.generation,
            "region withdrawn"
        );
        flushed.and(removed)
    }

    /// `stop` followed by `start`.
    pub fn restart(&self) -> Result<()> {
        self.stop()?;
        self.start()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(registry = self.name(), error = %e, "stop on drop failed");
        }
    }
}

fn same_domain(existing: &Arc<InstanceDomain>, name: &str) -> Result<Arc<InstanceDomain>> {
    if existing.name() == name {
        return Ok(Arc::clone(existing));
    }
    Err(MmvError::IdCollision {
        name: name.to_owned(),
        existing: existing.name().to_owned(),
        id: existing.id(),
    })
}

/// Wall-clock seconds, but always past `previous`.
fn next_generation(previous: i64) -> i64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    now.max(previous + 1)
}
