//! Top-level facade crate for mmvkit.
//!
//! Re-exports the format/type core and the registry so applications can
//! depend on a single crate.

pub mod core {
    pub use mmvkit_core::*;
}

pub mod registry {
    pub use mmvkit_registry::*;
}

pub use mmvkit_core::{
    CountUnit, MetricSemantics, MetricType, MetricUnit, MmvError, Result, SpaceUnit, TimeUnit,
    Value,
};
pub use mmvkit_registry::{
    Counter, InstanceDomain, InstanceMetric, Instances, Metric, Registry, SingletonMetric,
};
