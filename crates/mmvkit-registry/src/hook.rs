//! Write-through from metric containers into a live region.

use std::fmt;
use std::sync::Arc;

use mmvkit_core::error::Result;
use mmvkit_core::protocol::ValueSlot;
use mmvkit_core::Value;

/// Anything that can store a value at a slot of the published region.
///
/// The mapped region is the production sink; tests plug in recording sinks.
pub trait ValueSink: Send + Sync {
    fn write_value(&self, slot: ValueSlot, value: &Value) -> Result<()>;
}

/// Binding of one metric value (or one instance value) to its slot.
#[derive(Clone)]
pub struct UpdateHook {
    sink: Arc<dyn ValueSink>,
    slot: ValueSlot,
}

impl UpdateHook {
    pub fn new(sink: Arc<dyn ValueSink>, slot: ValueSlot) -> Self {
        Self { sink, slot }
    }

    pub fn slot(&self) -> ValueSlot {
        self.slot
    }

    pub fn write(&self, value: &Value) -> Result<()> {
        self.sink.write_value(self.slot, value)
    }
}

impl fmt::Debug for UpdateHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateHook").field("slot", &self.slot).finish()
    }
}
