//! Metric descriptors.

use mmvkit_core::error::{MmvError, Result};
use mmvkit_core::hash::{hash, METRIC_ID_BITS};
use mmvkit_core::protocol::MAX_NAME_LENGTH;
use mmvkit_core::{MetricSemantics, MetricType, MetricUnit};

/// Immutable description of a metric: identity, type, unit and help texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDesc {
    id: u32,
    name: String,
    metric_type: MetricType,
    semantics: MetricSemantics,
    unit: MetricUnit,
    short_description: String,
    long_description: String,
}

impl MetricDesc {
    /// `descriptions` holds at most a short and a long help text.
    pub fn new(
        name: &str,
        metric_type: MetricType,
        semantics: MetricSemantics,
        unit: impl Into<MetricUnit>,
        descriptions: &[&str],
    ) -> Result<Self> {
        if name.is_empty() {
            return Err(MmvError::EmptyName);
        }
        if name.len() > MAX_NAME_LENGTH {
            return Err(MmvError::NameTooLong {
                len: name.len(),
                max: MAX_NAME_LENGTH,
            });
        }
        if descriptions.len() > 2 {
            return Err(MmvError::TooManyDescriptions(descriptions.len()));
        }

        let help = |i: usize| descriptions.get(i).map(|s| (*s).to_owned()).unwrap_or_default();
        Ok(Self {
            id: hash(name, METRIC_ID_BITS),
            name: name.to_owned(),
            metric_type,
            semantics,
            unit: unit.into(),
            short_description: help(0),
            long_description: help(1),
        })
    }

    /// 10-bit item id derived from the name.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    pub fn semantics(&self) -> MetricSemantics {
        self.semantics
    }

    pub fn unit(&self) -> MetricUnit {
        self.unit
    }

    pub fn short_description(&self) -> &str {
        &self.short_description
    }

    pub fn long_description(&self) -> &str {
        &self.long_description
    }

    /// Short and long help joined by a newline.
    pub fn description(&self) -> String {
        format!("{}\n{}", self.short_description, self.long_description)
    }
}
