//! mmvkit registry: publish live metrics into a shared memory-mapped region.
//!
//! This crate wires instance domains, metric containers, the layout engine and
//! the mapped region into one writer-side stack. Application code registers
//! domains and metrics on a [`Registry`], starts it once, then calls setters;
//! every changed value is written straight into the region where an external
//! monitor polls it using the generation protocol from `mmvkit_core`.

pub mod config;
pub mod desc;
pub mod hook;
pub mod indom;
pub mod layout;
pub mod metric;
pub mod region;
pub mod registry;

pub use desc::MetricDesc;
pub use hook::{UpdateHook, ValueSink};
pub use indom::{Instance, InstanceDomain};
pub use metric::{Counter, InstanceMetric, Instances, Metric, MetricHandle, SingletonMetric};
pub use registry::Registry;
