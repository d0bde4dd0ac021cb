//! Shared error type across mmvkit crates.

use thiserror::Error;

use crate::types::MetricType;

/// Stable error codes (used by tooling and test vectors).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    EmptyName,
    NameTooLong,
    TooManyDescriptions,
    IncompatibleType,
    DuplicateInstance,
    UnknownInstance,
    InstanceCountMismatch,
    MissingInstanceValue,
    IdCollision,
    StringTooLong,
    OutOfBounds,
    RegionBuild,
    AlreadyStarted,
    InvalidFormat,
    UnsupportedVersion,
    Inconsistent,
    Regenerated,
    Config,
    Io,
}

impl ErrorCode {
    /// String representation used in logs and JSON output.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::EmptyName => "EMPTY_NAME",
            ErrorCode::NameTooLong => "NAME_TOO_LONG",
            ErrorCode::TooManyDescriptions => "TOO_MANY_DESCRIPTIONS",
            ErrorCode::IncompatibleType => "INCOMPATIBLE_TYPE",
            ErrorCode::DuplicateInstance => "DUPLICATE_INSTANCE",
            ErrorCode::UnknownInstance => "UNKNOWN_INSTANCE",
            ErrorCode::InstanceCountMismatch => "INSTANCE_COUNT_MISMATCH",
            ErrorCode::MissingInstanceValue => "MISSING_INSTANCE_VALUE",
            ErrorCode::IdCollision => "ID_COLLISION",
            ErrorCode::StringTooLong => "STRING_TOO_LONG",
            ErrorCode::OutOfBounds => "OUT_OF_BOUNDS",
            ErrorCode::RegionBuild => "REGION_BUILD",
            ErrorCode::AlreadyStarted => "ALREADY_STARTED",
            ErrorCode::InvalidFormat => "INVALID_FORMAT",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Inconsistent => "INCONSISTENT",
            ErrorCode::Regenerated => "REGENERATED",
            ErrorCode::Config => "CONFIG",
            ErrorCode::Io => "IO",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MmvError>;

/// Unified error type used by core and registry.
#[derive(Debug, Error)]
pub enum MmvError {
    #[error("name cannot be empty")]
    EmptyName,
    #[error("name is {len} bytes, at most {max} allowed")]
    NameTooLong { len: usize, max: usize },
    #[error("only 2 optional descriptions allowed (short and long), got {0}")]
    TooManyDescriptions(usize),
    #[error("value {value} is not compatible with type {ty}")]
    IncompatibleType { ty: MetricType, value: String },
    #[error("instance {0:?} already exists in the instance domain")]
    DuplicateInstance(String),
    #[error("{0:?} is not an instance of this metric")]
    UnknownInstance(String),
    #[error("expected values for {expected} instances, got {got}")]
    InstanceCountMismatch { expected: usize, got: usize },
    #[error("no value supplied for instance {0:?}")]
    MissingInstanceValue(String),
    #[error("{name:?} hashes to id {id}, already taken by {existing:?}")]
    IdCollision { name: String, existing: String, id: u32 },
    #[error("string of {len} bytes does not fit a {max} byte slot")]
    StringTooLong { len: usize, max: usize },
    #[error("write of {len} bytes at offset {offset} exceeds region of {size} bytes")]
    OutOfBounds { offset: usize, len: usize, size: usize },
    #[error("region build failed: {0}")]
    RegionBuild(String),
    #[error("registry already started; structural changes are rejected")]
    AlreadyStarted,
    #[error("invalid region format: {0}")]
    InvalidFormat(String),
    #[error("unsupported region version {0}")]
    UnsupportedVersion(i32),
    #[error("region is being rebuilt (gen1={gen1}, gen2={gen2})")]
    Inconsistent { gen1: i64, gen2: i64 },
    #[error("region was rebuilt (generation {previous} -> {current})")]
    Regenerated { previous: i64, current: i64 },
    #[error("config: {0}")]
    Config(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl MmvError {
    /// Map an error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MmvError::EmptyName => ErrorCode::EmptyName,
            MmvError::NameTooLong { .. } => ErrorCode::NameTooLong,
            MmvError::TooManyDescriptions(_) => ErrorCode::TooManyDescriptions,
            MmvError::IncompatibleType { .. } => ErrorCode::IncompatibleType,
            MmvError::DuplicateInstance(_) => ErrorCode::DuplicateInstance,
            MmvError::UnknownInstance(_) => ErrorCode::UnknownInstance,
            MmvError::InstanceCountMismatch { .. } => ErrorCode::InstanceCountMismatch,
            MmvError::MissingInstanceValue(_) => ErrorCode::MissingInstanceValue,
            MmvError::IdCollision { .. } => ErrorCode::IdCollision,
            MmvError::StringTooLong { .. } => ErrorCode::StringTooLong,
            MmvError::OutOfBounds { .. } => ErrorCode::OutOfBounds,
            MmvError::RegionBuild(_) => ErrorCode::RegionBuild,
            MmvError::AlreadyStarted => ErrorCode::AlreadyStarted,
            MmvError::InvalidFormat(_) => ErrorCode::InvalidFormat,
            MmvError::UnsupportedVersion(_) => ErrorCode::UnsupportedVersion,
            MmvError::Inconsistent { .. } => ErrorCode::Inconsistent,
            MmvError::Regenerated { .. } => ErrorCode::Regenerated,
            MmvError::Config(_) => ErrorCode::Config,
            MmvError::Io(_) => ErrorCode::Io,
        }
    }

    /// Whether a reader should simply poll again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MmvError::Inconsistent { .. } | MmvError::Regenerated { .. })
    }
}
