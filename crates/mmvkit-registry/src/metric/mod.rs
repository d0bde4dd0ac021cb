//! Value containers.
//!
//! - `SingletonMetric`: exactly one value.
//! - `InstanceMetric`: one value per instance of a domain.
//! - `Counter`: a monotonic `Int64` singleton with increment helpers.
//!
//! Setters validate against the descriptor's type, skip unchanged values, and
//! write through the attached `UpdateHook` before committing locally, so a
//! failed write leaves the container untouched.

mod counter;
mod instance;
mod singleton;

use std::sync::Arc;

use mmvkit_core::error::MmvError;
use mmvkit_core::{MetricSemantics, MetricType, MetricUnit, Value};

use crate::desc::MetricDesc;
use crate::indom::InstanceDomain;

pub use counter::Counter;
pub use instance::{InstanceMetric, Instances};
pub use singleton::SingletonMetric;

/// Read-only surface shared by every metric container.
pub trait Metric {
    fn desc(&self) -> &MetricDesc;

    /// Domain the metric spans, if any.
    fn indom(&self) -> Option<&Arc<InstanceDomain>> {
        None
    }

    fn id(&self) -> u32 {
        self.desc().id()
    }

    fn name(&self) -> &str {
        self.desc().name()
    }

    fn metric_type(&self) -> MetricType {
        self.desc().metric_type()
    }

    fn semantics(&self) -> MetricSemantics {
        self.desc().semantics()
    }

    fn unit(&self) -> MetricUnit {
        self.desc().unit()
    }

    fn short_description(&self) -> &str {
        self.desc().short_description()
    }

    fn long_description(&self) -> &str {
        self.desc().long_description()
    }

    fn description(&self) -> String {
        self.desc().description()
    }
}

/// A metric as held by a registry.
#[derive(Debug, Clone)]
pub enum MetricHandle {
    Singleton(Arc<SingletonMetric>),
    Instance(Arc<InstanceMetric>),
}

impl MetricHandle {
    pub fn desc(&self) -> &MetricDesc {
        match self {
            Self::Singleton(m) => m.desc(),
            Self::Instance(m) => m.desc(),
        }
    }

    pub fn indom(&self) -> Option<&Arc<InstanceDomain>> {
        match self {
            Self::Singleton(_) => None,
            Self::Instance(m) => Some(m.domain()),
        }
    }

    /// Whether both handles point at the same container.
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Singleton(a), Self::Singleton(b)) => Arc::ptr_eq(a, b),
            (Self::Instance(a), Self::Instance(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) fn detach(&self) {
        match self {
            Self::Singleton(m) => m.detach(),
            Self::Instance(m) => m.detach(),
        }
    }
}

impl From<Arc<SingletonMetric>> for MetricHandle {
    fn from(m: Arc<SingletonMetric>) -> Self {
        Self::Singleton(m)
    }
}

impl From<Arc<InstanceMetric>> for MetricHandle {
    fn from(m: Arc<InstanceMetric>) -> Self {
        Self::Instance(m)
    }
}

impl From<Arc<Counter>> for MetricHandle {
    fn from(c: Arc<Counter>) -> Self {
        Self::Singleton(Arc::clone(c.metric()))
    }
}

impl From<&Arc<Counter>> for MetricHandle {
    fn from(c: &Arc<Counter>) -> Self {
        Self::Singleton(Arc::clone(c.metric()))
    }
}

/// Check `value` against `ty` and narrow it to the exact stored width.
pub(crate) fn admit(ty: MetricType, value: Value) -> mmvkit_core::Result<Value> {
    if !ty.is_compatible(&value) {
        return Err(MmvError::IncompatibleType {
            ty,
            value: value.to_string(),
        });
    }
    Ok(ty.resolve(value))
}
