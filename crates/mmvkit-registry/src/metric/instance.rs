use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockUpgradableReadGuard};

use mmvkit_core::error::{MmvError, Result};
use mmvkit_core::{MetricSemantics, MetricType, MetricUnit, Value};

use crate::desc::MetricDesc;
use crate::hook::UpdateHook;
use crate::indom::InstanceDomain;

use super::{admit, Metric};

/// Initial values of an instance metric, keyed by instance name.
pub type Instances = HashMap<String, Value>;

#[derive(Debug)]
struct InstanceValue {
    value: Value,
    hook: Option<UpdateHook>,
}

/// A metric holding one value per instance of its domain.
#[derive(Debug)]
pub struct InstanceMetric {
    desc: MetricDesc,
    indom: Arc<InstanceDomain>,
    values: RwLock<HashMap<String, InstanceValue>>,
}

impl InstanceMetric {
    /// `values` must name every instance of `indom` exactly once.
    pub fn new(
        mut values: Instances,
        name: &str,
        indom: &Arc<InstanceDomain>,
        metric_type: MetricType,
        semantics: MetricSemantics,
        unit: impl Into<MetricUnit>,
        descriptions: &[&str],
    ) -> Result<Self> {
        let expected = indom.instance_count();
        if values.len() != expected {
            return Err(MmvError::InstanceCountMismatch {
                expected,
                got: values.len(),
            });
        }
        let desc = MetricDesc::new(name, metric_type, semantics, unit, descriptions)?;

        let mut admitted = HashMap::with_capacity(expected);
        for instance in indom.instances() {
            let value = values
                .remove(instance.name())
                .ok_or_else(|| MmvError::MissingInstanceValue(instance.name().to_owned()))?;
            admitted.insert(
                instance.name().to_owned(),
                InstanceValue {
                    value: admit(metric_type, value)?,
                    hook: None,
                },
            );
        }

        Ok(Self {
            desc,
            indom: Arc::clone(indom),
            values: RwLock::new(admitted),
        })
    }

    pub fn domain(&self) -> &Arc<InstanceDomain> {
        &self.indom
    }

    /// Instances this metric carries values for, in domain order.
    pub fn instances(&self) -> Vec<String> {
        let values = self.values.read();
        self.indom
            .instances()
            .into_iter()
            .map(|i| i.name().to_owned())
            .filter(|name| values.contains_key(name))
            .collect()
    }

    pub fn get_instance(&self, instance: &str) -> Result<Value> {
        self.values
            .read()
            .get(instance)
            .map(|v| v.value.clone())
            .ok_or_else(|| MmvError::UnknownInstance(instance.to_owned()))
    }

    pub fn set_instance(&self, instance: &str, value: impl Into<Value>) -> Result<()> {
        let value = admit(self.desc.metric_type(), value.into())?;

        let values = self.values.upgradable_read();
        match values.get(instance) {
            None => return Err(MmvError::UnknownInstance(instance.to_owned())),
            Some(current) if current.value == value => return Ok(()),
            Some(_) => {}
        }
        let mut values = RwLockUpgradableReadGuard::upgrade(values);
        let slot = values
            .get_mut(instance)
            .ok_or_else(|| MmvError::UnknownInstance(instance.to_owned()))?;
        if let Some(hook) = &slot.hook {
            hook.write(&value)?;
        }
        slot.value = value;
        Ok(())
    }

    /// `set_instance`, panicking on error.
    pub fn must_set_instance(&self, instance: &str, value: impl Into<Value>) {
        if let Err(e) = self.set_instance(instance, value) {
            panic!("{}[{instance}]: {e}", self.desc.name());
        }
    }

    /// Bind one instance value to a region slot, writing the current value through it.
    pub fn attach_instance(&self, instance: &str, hook: UpdateHook) -> Result<()> {
        let mut values = self.values.write();
        let slot = values
            .get_mut(instance)
            .ok_or_else(|| MmvError::UnknownInstance(instance.to_owned()))?;
        hook.write(&slot.value)?;
        slot.hook = Some(hook);
        Ok(())
    }

    pub fn detach(&self) {
        for slot in self.values.write().values_mut() {
            slot.hook = None;
        }
    }
}

impl Metric for InstanceMetric {
    fn desc(&self) -> &MetricDesc {
        &self.desc
    }

    fn indom(&self) -> Option<&Arc<InstanceDomain>> {
        Some(&self.indom)
    }
}
