//! Tagged metric values.

use std::fmt;

use serde::Serialize;

use crate::types::MetricType;

/// A metric value.
///
/// The first seven variants mirror [`MetricType`] one to one and are the only
/// shapes a metric ever stores. `Int` and `Uint` are machine-word inputs whose
/// compatibility is range-checked against the target type and which
/// [`MetricType::resolve`] narrows or widens to an exact variant. `Double`
/// doubles as the generic float input: it resolves to `Float` when the target
/// is a 32-bit float and the value is in range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Int(isize),
    Uint(usize),
}

impl Value {
    /// The exact type this value is stored as, `None` for machine-word inputs.
    pub fn exact_type(&self) -> Option<MetricType> {
        match self {
            Value::Int32(_) => Some(MetricType::Int32),
            Value::Uint32(_) => Some(MetricType::Uint32),
            Value::Int64(_) => Some(MetricType::Int64),
            Value::Uint64(_) => Some(MetricType::Uint64),
            Value::Float(_) => Some(MetricType::Float),
            Value::Double(_) => Some(MetricType::Double),
            Value::String(_) => Some(MetricType::String),
            Value::Int(_) | Value::Uint(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int32(v) => write!(f, "{v}i32"),
            Value::Uint32(v) => write!(f, "{v}u32"),
            Value::Int64(v) => write!(f, "{v}i64"),
            Value::Uint64(v) => write!(f, "{v}u64"),
            Value::Float(v) => write!(f, "{v}f32"),
            Value::Double(v) => write!(f, "{v}f64"),
            Value::String(v) => write!(f, "{v:?}"),
            Value::Int(v) => write!(f, "{v}isize"),
            Value::Uint(v) => write!(f, "{v}usize"),
        }
    }
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    i32 => Int32,
    u32 => Uint32,
    i64 => Int64,
    u64 => Uint64,
    f32 => Float,
    f64 => Double,
    String => String,
    isize => Int,
    usize => Uint,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}
