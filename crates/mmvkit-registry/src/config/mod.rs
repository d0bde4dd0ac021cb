//! Registry config loader (strict parsing).

pub mod schema;

use std::fs;

use mmvkit_core::error::{MmvError, Result};

pub use schema::{FlagsSection, MmvConfig, PublisherSection, RegistrySection};

pub fn load_from_file(path: &str) -> Result<MmvConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| MmvError::Config(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<MmvConfig> {
    let cfg: MmvConfig =
        serde_yaml::from_str(s).map_err(|e| MmvError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
