//! Metric units, bit-packed into the 32-bit pmUnits layout.
//!
//! ```text
//!  31    28 27    24 23    20 19    16 15    12 11     8 7      0
//! | dim sp | dim t  | dim c  | sc sp  | sc t   | sc c   |  pad   |
//! ```
//!
//! Each family sets a different dimension nibble, so encoded values of two
//! families never compare equal even where their scales coincide.

use std::fmt;

use serde::Serialize;

const SPACE_DIM_SHIFT: u32 = 28;
const TIME_DIM_SHIFT: u32 = 24;
const COUNT_DIM_SHIFT: u32 = 20;
const SPACE_SCALE_SHIFT: u32 = 16;
const TIME_SCALE_SHIFT: u32 = 12;
const COUNT_SCALE_SHIFT: u32 = 8;

/// Units of space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SpaceUnit {
    Byte,
    Kilobyte,
    Megabyte,
    Gigabyte,
    Terabyte,
    Petabyte,
    Exabyte,
}

impl SpaceUnit {
    pub const ALL: [SpaceUnit; 7] = [
        SpaceUnit::Byte,
        SpaceUnit::Kilobyte,
        SpaceUnit::Megabyte,
        SpaceUnit::Gigabyte,
        SpaceUnit::Terabyte,
        SpaceUnit::Petabyte,
        SpaceUnit::Exabyte,
    ];

    fn scale(self) -> u32 {
        self as u32
    }

    pub fn pmapi(self) -> u32 {
        (1 << SPACE_DIM_SHIFT) | (self.scale() << SPACE_SCALE_SHIFT)
    }
}

/// Units of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TimeUnit {
    Nanosecond,
    Microsecond,
    Millisecond,
    Second,
    Minute,
    Hour,
}

impl TimeUnit {
    pub const ALL: [TimeUnit; 6] = [
        TimeUnit::Nanosecond,
        TimeUnit::Microsecond,
        TimeUnit::Millisecond,
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
    ];

    fn scale(self) -> u32 {
        self as u32
    }

    pub fn pmapi(self) -> u32 {
        (1 << TIME_DIM_SHIFT) | (self.scale() << TIME_SCALE_SHIFT)
    }
}

/// Counted quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CountUnit {
    One,
}

impl CountUnit {
    fn scale(self) -> u32 {
        0
    }

    pub fn pmapi(self) -> u32 {
        match self {
            CountUnit::One => (1 << COUNT_DIM_SHIFT) | (self.scale() << COUNT_SCALE_SHIFT),
        }
    }
}

/// A unit from exactly one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MetricUnit {
    Space(SpaceUnit),
    Time(TimeUnit),
    Count(CountUnit),
}

impl MetricUnit {
    /// 32-bit encoding written to metric records.
    pub fn pmapi(self) -> u32 {
        match self {
            MetricUnit::Space(u) => u.pmapi(),
            MetricUnit::Time(u) => u.pmapi(),
            MetricUnit::Count(u) => u.pmapi(),
        }
    }

    /// Inverse of [`MetricUnit::pmapi`] for single-family units.
    pub fn from_pmapi(code: u32) -> Option<Self> {
        SpaceUnit::ALL
            .into_iter()
            .map(MetricUnit::Space)
            .chain(TimeUnit::ALL.into_iter().map(MetricUnit::Time))
            .chain(std::iter::once(MetricUnit::Count(CountUnit::One)))
            .find(|u| u.pmapi() == code)
    }
}

impl From<SpaceUnit> for MetricUnit {
    fn from(u: SpaceUnit) -> Self {
        MetricUnit::Space(u)
    }
}

impl From<TimeUnit> for MetricUnit {
    fn from(u: TimeUnit) -> Self {
        MetricUnit::Time(u)
    }
}

impl From<CountUnit> for MetricUnit {
    fn from(u: CountUnit) -> Self {
        MetricUnit::Count(u)
    }
}

impl fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricUnit::Space(u) => write!(f, "{u:?}Unit"),
            MetricUnit::Time(u) => write!(f, "{u:?}Unit"),
            MetricUnit::Count(u) => write!(f, "{u:?}Unit"),
        }
    }
}
