use parking_lot::{RwLock, RwLockUpgradableReadGuard};

use mmvkit_core::error::Result;
use mmvkit_core::{MetricSemantics, MetricType, MetricUnit, Value};

use crate::desc::MetricDesc;
use crate::hook::UpdateHook;

use super::{admit, Metric};

#[derive(Debug)]
struct SingletonState {
    value: Value,
    hook: Option<UpdateHook>,
}

/// A metric holding exactly one value.
#[derive(Debug)]
pub struct SingletonMetric {
    desc: MetricDesc,
    state: RwLock<SingletonState>,
}

impl SingletonMetric {
    pub fn new(
        value: impl Into<Value>,
        name: &str,
        metric_type: MetricType,
        semantics: MetricSemantics,
        unit: impl Into<MetricUnit>,
        descriptions: &[&str],
    ) -> Result<Self> {
        let value = admit(metric_type, value.into())?;
        let desc = MetricDesc::new(name, metric_type, semantics, unit, descriptions)?;
        Ok(Self {
            desc,
            state: RwLock::new(SingletonState { value, hook: None }),
        })
    }

    pub fn get(&self) -> Value {
        self.state.read().value.clone()
    }

    /// Replace the value. Setting the current value again is a no-op and
    /// does not touch the region.
    pub fn set(&self, value: impl Into<Value>) -> Result<()> {
        let value = admit(self.desc.metric_type(), value.into())?;

        let state = self.state.upgradable_read();
        if state.value == value {
            return Ok(());
        }
        let mut state = RwLockUpgradableReadGuard::upgrade(state);
        if let Some(hook) = &state.hook {
            hook.write(&value)?;
        }
        state.value = value;
        Ok(())
    }

    /// `set`, panicking on error.
    pub fn must_set(&self, value: impl Into<Value>) {
        if let Err(e) = self.set(value) {
            panic!("{}: {e}", self.desc.name());
        }
    }

    /// Bind the value to a region slot, writing the current value through it.
    pub fn attach(&self, hook: UpdateHook) -> Result<()> {
        let mut state = self.state.write();
        hook.write(&state.value)?;
        state.hook = Some(hook);
        Ok(())
    }

    pub fn detach(&self) {
        self.state.write().hook = None;
    }

    pub fn is_attached(&self) -> bool {
        self.state.read().hook.is_some()
    }
}

impl Metric for SingletonMetric {
    fn desc(&self) -> &MetricDesc {
        &self.desc
    }
}
