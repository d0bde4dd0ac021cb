//! mmvkit core: identifiers, the metric type model, and the binary region format.
//!
//! This crate defines the wire-level contracts and error surface shared by the
//! registry, the publisher binaries, and any out-of-process reader. It carries
//! no OS or runtime dependencies so a monitor can link it on its own.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Every fallible path surfaces as `MmvError`/`Result`; a reader handed a
//! half-written or foreign region gets an error, never a crash.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod hash;
pub mod protocol;
pub mod types;
pub mod units;
pub mod value;

/// Shared result type.
pub use error::{ErrorCode, MmvError, Result};
pub use hash::{hash, murmur3_32};
pub use types::{MetricSemantics, MetricType};
pub use units::{CountUnit, MetricUnit, SpaceUnit, TimeUnit};
pub use value::Value;
