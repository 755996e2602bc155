//! Addressable element references

use super::monitor::Monitor;
use super::value::{ObjectRef, Value};
use crate::boxing;
use crate::error::RuntimeResult;
use crate::runtime::TypeSystem;

/// Addressable box over one slot of an array or instance
///
/// Loads and stores go through to the slot, so the box always observes the
/// container's current contents.
pub struct ElementRef {
    container: ObjectRef,
    index: usize,
    monitor: Monitor,
}

impl ElementRef {
    pub(crate) fn new(container: ObjectRef, index: usize) -> Self {
        Self {
            container,
            index,
            monitor: Monitor::new(),
        }
    }

    /// Object holding the slot
    pub fn container(&self) -> &ObjectRef {
        &self.container
    }

    /// Slot index
    pub fn index(&self) -> usize {
        self.index
    }

    /// Current slot contents
    pub fn load(&self, system: &TypeSystem) -> RuntimeResult<Value> {
        boxing::load(system, &self.container, self.index)
    }

    /// Overwrite the slot
    pub fn store(&self, system: &TypeSystem, value: Value) -> RuntimeResult<()> {
        boxing::store(system, &self.container, self.index, value)
    }

    /// Reference monitor
    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }
}

impl std::fmt::Debug for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementRef")
            .field("container", &self.container)
            .field("index", &self.index)
            .finish()
    }
}
