use std::sync::Arc;

use parking_lot::Mutex;

use mmvkit_core::error::Result;
use mmvkit_core::{CountUnit, MetricSemantics, MetricType, Value};

use crate::desc::MetricDesc;

use super::{Metric, SingletonMetric};

/// Monotonic `Int64` count with `Counter` semantics and `One` unit.
///
/// Read-modify-write steps are serialized, so concurrent `up()` calls never
/// lose an increment. The inner singleton is not handed out, so every write
/// goes through that step lock.
///
/// ```compile_fail
/// use mmvkit_registry::Counter;
///
/// let requests = Counter::new(0, "requests", &[]).unwrap();
/// requests.metric().set(5i64).unwrap();
/// ```
#[derive(Debug)]
pub struct Counter {
    metric: Arc<SingletonMetric>,
    step: Mutex<()>,
}

impl Counter {
    pub fn new(val: i64, name: &str, descriptions: &[&str]) -> Result<Self> {
        let metric = SingletonMetric::new(
            val,
            name,
            MetricType::Int64,
            MetricSemantics::Counter,
            CountUnit::One,
            descriptions,
        )?;
        Ok(Self {
            metric: Arc::new(metric),
            step: Mutex::new(()),
        })
    }

    /// Underlying singleton, as registered with a registry.
    pub(crate) fn metric(&self) -> &Arc<SingletonMetric> {
        &self.metric
    }

    pub fn val(&self) -> i64 {
        match self.metric.get() {
            Value::Int64(v) => v,
            _ => 0,
        }
    }

    pub fn set(&self, val: i64) -> Result<()> {
        let _step = self.step.lock();
        self.metric.set(val)
    }

    pub fn inc(&self, delta: i64) -> Result<()> {
        let _step = self.step.lock();
        self.metric.set(self.val().wrapping_add(delta))
    }

    pub fn must_inc(&self, delta: i64) {
        if let Err(e) = self.inc(delta) {
            panic!("{}: {e}", self.name());
        }
    }

    pub fn dec(&self, delta: i64) -> Result<()> {
        self.inc(delta.wrapping_neg())
    }

    pub fn must_dec(&self, delta: i64) {
        if let Err(e) = self.dec(delta) {
            panic!("{}: {e}", self.name());
        }
    }

    pub fn up(&self) {
        self.must_inc(1);
    }

    pub fn down(&self) {
        self.must_dec(1);
    }
}

impl Metric for Counter {
    fn desc(&self) -> &MetricDesc {
        self.metric.desc()
    }
}
