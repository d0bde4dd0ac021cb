use std::path::PathBuf;

use serde::Deserialize;

use mmvkit_core::error::{MmvError, Result};
use mmvkit_core::hash::{hash, CLUSTER_ID_BITS};
use mmvkit_core::protocol::{FLAG_NO_PREFIX, FLAG_PROCESS, FLAG_SENTINEL, MAX_NAME_LENGTH};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MmvConfig {
    pub version: u32,

    pub registry: RegistrySection,

    #[serde(default)]
    pub publisher: PublisherSection,
}

impl MmvConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MmvError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.registry.validate()?;
        self.publisher.validate()?;

        Ok(())
    }
}

/// Where and how the region is published.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrySection {
    /// Region name; also the file name under `dir`.
    pub name: String,

    /// Directory holding region files.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Cluster id written to the header (12 bits).
    #[serde(default)]
    pub cluster_id: Option<u32>,

    /// Delete the region file when the registry stops.
    #[serde(default = "default_remove_on_stop")]
    pub remove_on_stop: bool,

    #[serde(default)]
    pub flags: FlagsSection,
}

impl RegistrySection {
    /// Defaults for a registry named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dir: None,
            cluster_id: None,
            remove_on_stop: default_remove_on_stop(),
            flags: FlagsSection::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(MmvError::Config("registry.name must not be empty".into()));
        }
        if self.name.len() > MAX_NAME_LENGTH {
            return Err(MmvError::Config(format!(
                "registry.name must be at most {MAX_NAME_LENGTH} bytes"
            )));
        }
        if self.name.contains('/') {
            return Err(MmvError::Config("registry.name must not contain '/'".into()));
        }
        if let Some(id) = self.cluster_id {
            if id >= 1 << CLUSTER_ID_BITS {
                return Err(MmvError::Config(format!(
                    "registry.cluster_id must be below {}",
                    1u32 << CLUSTER_ID_BITS
                )));
            }
        }
        Ok(())
    }

    /// Full path of the region file.
    pub fn path(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(default_dir).join(&self.name)
    }

    pub fn cluster(&self) -> u32 {
        self.cluster_id
            .unwrap_or_else(|| hash(&self.name, CLUSTER_ID_BITS))
    }
}

/// Header flags.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlagsSection {
    #[serde(default)]
    pub no_prefix: bool,
    #[serde(default = "default_true")]
    pub process: bool,
    #[serde(default)]
    pub sentinel: bool,
}

impl Default for FlagsSection {
    fn default() -> Self {
        Self {
            no_prefix: false,
            process: true,
            sentinel: false,
        }
    }
}

impl FlagsSection {
    pub fn bits(&self) -> u32 {
        let mut bits = 0;
        if self.no_prefix {
            bits |= FLAG_NO_PREFIX;
        }
        if self.process {
            bits |= FLAG_PROCESS;
        }
        if self.sentinel {
            bits |= FLAG_SENTINEL;
        }
        bits
    }
}

/// Settings for the `mmv-publish` binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublisherSection {
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
}

impl Default for PublisherSection {
    fn default() -> Self {
        Self {
            update_interval_ms: default_update_interval_ms(),
        }
    }
}

impl PublisherSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=60000).contains(&self.update_interval_ms) {
            return Err(MmvError::Config(
                "publisher.update_interval_ms must be between 100 and 60000".into(),
            ));
        }
        Ok(())
    }
}

/// `$PCP_TMP_DIR/mmv`, falling back to the system temp dir.
fn default_dir() -> PathBuf {
    std::env::var_os("PCP_TMP_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
        .join("mmv")
}

fn default_remove_on_stop() -> bool {
    true
}
fn default_true() -> bool {
    true
}
fn default_update_interval_ms() -> u64 {
    1000
}
