//! Instance domains: named, ordered sets of instances a metric can span.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use mmvkit_core::error::{MmvError, Result};
use mmvkit_core::hash::hash;
use mmvkit_core::protocol::MAX_NAME_LENGTH;

/// One member of an instance domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    id: u32,
    name: String,
    indom: u32,
}

impl Instance {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the owning domain.
    pub fn indom_id(&self) -> u32 {
        self.indom
    }
}

#[derive(Debug, Default)]
struct Members {
    ordered: Vec<Instance>,
    by_id: HashMap<u32, usize>,
}

/// A named set of instances, identified by the 32-bit hash of its name.
///
/// Instances keep insertion order; that order is the order they are laid out
/// in the region. Once the owning registry starts, the domain is sealed and
/// further `add_instance` calls fail with `AlreadyStarted`.
#[derive(Debug)]
pub struct InstanceDomain {
    id: u32,
    name: String,
    short_help: String,
    long_help: String,
    members: RwLock<Members>,
    sealed: AtomicBool,
}

impl InstanceDomain {
    pub fn new(
        name: impl Into<String>,
        short_help: impl Into<String>,
        long_help: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            id: hash(&name, 0),
            name,
            short_help: short_help.into(),
            long_help: long_help.into(),
            members: RwLock::new(Members::default()),
            sealed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_help(&self) -> &str {
        &self.short_help
    }

    pub fn long_help(&self) -> &str {
        &self.long_help
    }

    pub fn add_instance(&self, name: &str) -> Result<()> {
        if self.sealed.load(Ordering::Acquire) {
            return Err(MmvError::AlreadyStarted);
        }
        if name.is_empty() {
            return Err(MmvError::EmptyName);
        }
        if name.len() > MAX_NAME_LENGTH {
            return Err(MmvError::NameTooLong {
                len: name.len(),
                max: MAX_NAME_LENGTH,
            });
        }

        let id = hash(name, 0);
        let mut members = self.members.write();
        if members.by_id.contains_key(&id) {
            return Err(MmvError::DuplicateInstance(name.to_owned()));
        }
        let at = members.ordered.len();
        members.ordered.push(Instance {
            id,
            name: name.to_owned(),
            indom: self.id,
        });
        members.by_id.insert(id, at);
        Ok(())
    }

    pub fn has_instance(&self, name: &str) -> bool {
        self.instance(name).is_some()
    }

    pub fn instance(&self, name: &str) -> Option<Instance> {
        let members = self.members.read();
        members
            .by_id
            .get(&hash(name, 0))
            .and_then(|at| members.ordered.get(*at))
            .filter(|i| i.name == name)
            .cloned()
    }

    pub fn instance_count(&self) -> usize {
        self.members.read().ordered.len()
    }

    /// Instances in insertion order.
    pub fn instances(&self) -> Vec<Instance> {
        self.members.read().ordered.clone()
    }

    pub(crate) fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    pub(crate) fn unseal(&self) {
        self.sealed.store(false, Ordering::Release);
    }
}

impl fmt::Display for InstanceDomain {
    /// `InstanceDomain: disk[sda,sdb]`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceDomain: {}[", self.name)?;
        for (i, instance) in self.members.read().ordered.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(&instance.name)?;
        }
        f.write_str("]")
    }
}
