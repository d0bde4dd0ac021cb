//! Metric type and semantics model.
//!
//! Numeric codes are part of the region format and must not change.

use std::fmt;

use serde::Serialize;

use crate::value::Value;

/// Every type a metric value can be published as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MetricType {
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float,
    Double,
    String,
}

impl MetricType {
    pub const ALL: [MetricType; 7] = [
        MetricType::Int32,
        MetricType::Uint32,
        MetricType::Int64,
        MetricType::Uint64,
        MetricType::Float,
        MetricType::Double,
        MetricType::String,
    ];

    /// Wire code.
    pub fn code(self) -> i32 {
        match self {
            MetricType::Int32 => 0,
            MetricType::Uint32 => 1,
            MetricType::Int64 => 2,
            MetricType::Uint64 => 3,
            MetricType::Float => 4,
            MetricType::Double => 5,
            MetricType::String => 6,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        MetricType::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricType::Int32 => "Int32Type",
            MetricType::Uint32 => "Uint32Type",
            MetricType::Int64 => "Int64Type",
            MetricType::Uint64 => "Uint64Type",
            MetricType::Float => "FloatType",
            MetricType::Double => "DoubleType",
            MetricType::String => "StringType",
        }
    }

    /// Whether `val` can be stored as this type.
    ///
    /// Fixed-width inputs must match exactly. Machine-word integers and
    /// doubles are range-checked against what this type can represent.
    pub fn is_compatible(self, val: &Value) -> bool {
        match *val {
            Value::Int(v) => self.fits_int(v as i64),
            Value::Uint(v) => self.fits_uint(v as u64),
            Value::Double(v) => self.fits_double(v),
            Value::Int32(_) => self == MetricType::Int32,
            Value::Uint32(_) => self == MetricType::Uint32,
            Value::Int64(_) => self == MetricType::Int64,
            Value::Uint64(_) => self == MetricType::Uint64,
            Value::Float(_) => self == MetricType::Float,
            Value::String(_) => self == MetricType::String,
        }
    }

    /// Narrow or widen `val` to the exact variant this type stores.
    ///
    /// Exact values and values incompatible with this type are returned
    /// unchanged, so resolving twice is the same as resolving once.
    pub fn resolve(self, val: Value) -> Value {
        match (self, val) {
            (MetricType::Int32, Value::Int(v)) => i32::try_from(v)
                .map(Value::Int32)
                .unwrap_or(Value::Int(v)),
            (MetricType::Int64, Value::Int(v)) => Value::Int64(v as i64),
            (MetricType::Uint32, Value::Int(v)) => u32::try_from(v)
                .map(Value::Uint32)
                .unwrap_or(Value::Int(v)),
            (MetricType::Uint64, Value::Int(v)) => u64::try_from(v)
                .map(Value::Uint64)
                .unwrap_or(Value::Int(v)),
            (MetricType::Uint32, Value::Uint(v)) => u32::try_from(v)
                .map(Value::Uint32)
                .unwrap_or(Value::Uint(v)),
            (MetricType::Uint64, Value::Uint(v)) => Value::Uint64(v as u64),
            (MetricType::Float, Value::Double(v)) if self.fits_double(v) => {
                Value::Float(v as f32)
            }
            (_, val) => val,
        }
    }

    fn fits_int(self, v: i64) -> bool {
        match self {
            MetricType::Int32 => i32::try_from(v).is_ok(),
            MetricType::Int64 => true,
            MetricType::Uint32 => u32::try_from(v).is_ok(),
            MetricType::Uint64 => v >= 0,
            _ => false,
        }
    }

    fn fits_uint(self, v: u64) -> bool {
        if v <= u64::from(u32::MAX) {
            matches!(self, MetricType::Uint32 | MetricType::Uint64)
        } else {
            self == MetricType::Uint64
        }
    }

    fn fits_double(self, v: f64) -> bool {
        let max = f64::from(f32::MAX);
        if (-max..=max).contains(&v) {
            matches!(self, MetricType::Float | MetricType::Double)
        } else {
            self == MetricType::Double
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a monitor should interpret successive values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MetricSemantics {
    None,
    /// Monotonic, non-decreasing.
    Counter,
    /// Point in time.
    Instant,
    /// Enumerated state.
    Discrete,
}

impl MetricSemantics {
    /// Wire code (2 is unused by the format).
    pub fn code(self) -> i32 {
        match self {
            MetricSemantics::None => 0,
            MetricSemantics::Counter => 1,
            MetricSemantics::Instant => 3,
            MetricSemantics::Discrete => 4,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(MetricSemantics::None),
            1 => Some(MetricSemantics::Counter),
            3 => Some(MetricSemantics::Instant),
            4 => Some(MetricSemantics::Discrete),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricSemantics::None => "NoSemantics",
            MetricSemantics::Counter => "CounterSemantics",
            MetricSemantics::Instant => "InstantSemantics",
            MetricSemantics::Discrete => "DiscreteSemantics",
        }
    }
}

impl fmt::Display for MetricSemantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
