/// SharedContextData - state shared by every context of one pool
///
/// Owned (through `Arc`) by the pool's contexts. Holds the disposal registry
/// and a lost flag that backends flip when the pool is torn down.

use std::sync::atomic::{AtomicBool, Ordering};
use crate::context::DisposalRegistry;

/// Shared state of a graphics-context pool
pub struct SharedContextData {
    registry: DisposalRegistry,
    lost: AtomicBool,
}

impl SharedContextData {
    pub fn new() -> Self {
        Self {
            registry: DisposalRegistry::new(),
            lost: AtomicBool::new(false),
        }
    }

    /// Registry of live GPU objects
    pub fn registry(&self) -> &DisposalRegistry {
        &self.registry
    }

    /// Dispose all registered objects (pool teardown)
    pub fn dispose_objects(&self) -> usize {
        let count = self.registry.dispose_all();
        if count > 0 {
            crate::engine_debug!("prism::context", "Disposed {} objects at pool teardown", count);
        }
        count
    }

    /// Mark the pool as unusable. Activation fails from now on.
    pub fn mark_lost(&self) {
        self.lost.store(true, Ordering::Release);
    }

    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }
}

impl Default for SharedContextData {
    fn default() -> Self {
        Self::new()
    }
}
