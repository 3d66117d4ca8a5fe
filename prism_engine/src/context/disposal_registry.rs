/// Disposal registry - tracks live GPU objects of one context pool
///
/// Every buffer provider registers a weak reference to itself at construction
/// and removes it when disposed. When the pool is torn down, `dispose_all`
/// disposes whatever is still alive so no native handle outlives its device.

use std::sync::{Arc, Mutex, Weak};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Key of one registry entry
    pub struct DisposableKey;
}

/// A GPU object that can release its native resources on demand
pub trait Disposable: Send + Sync {
    /// Release native resources. Must be idempotent.
    fn dispose(&self);
}

/// Registry of live disposable objects
pub struct DisposalRegistry {
    entries: Mutex<SlotMap<DisposableKey, Weak<dyn Disposable>>>,
}

impl DisposalRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(SlotMap::with_key()),
        }
    }

    /// Add an object, returning the key needed to remove it again
    pub fn register(&self, object: Weak<dyn Disposable>) -> DisposableKey {
        match self.entries.lock() {
            Ok(mut entries) => entries.insert(object),
            Err(poisoned) => poisoned.into_inner().insert(object),
        }
    }

    /// Remove an object. Returns false if the key was not registered.
    pub fn unregister(&self, key: DisposableKey) -> bool {
        match self.entries.lock() {
            Ok(mut entries) => entries.remove(key).is_some(),
            Err(poisoned) => poisoned.into_inner().remove(key).is_some(),
        }
    }

    pub fn contains(&self, key: DisposableKey) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }

    /// Number of registered objects
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dispose every object that is still alive
    ///
    /// The registry lock is released before calling `dispose`, since disposal
    /// unregisters the object. Returns the number of objects disposed.
    pub fn dispose_all(&self) -> usize {
        let live: Vec<Arc<dyn Disposable>> = match self.entries.lock() {
            Ok(entries) => entries.values().filter_map(Weak::upgrade).collect(),
            Err(_) => return 0,
        };
        for object in &live {
            object.dispose();
        }
        live.len()
    }
}

impl Default for DisposalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII registration token held by a disposable object
///
/// `release` removes the entry exactly once; later calls and the drop are no-ops.
pub struct Registration {
    registry: Weak<crate::context::SharedContextData>,
    key: Mutex<Option<DisposableKey>>,
}

impl Registration {
    /// Register `object` with the pool's registry
    pub fn new(shared: &Arc<crate::context::SharedContextData>, object: Weak<dyn Disposable>) -> Self {
        let key = shared.registry().register(object);
        Self {
            registry: Arc::downgrade(shared),
            key: Mutex::new(Some(key)),
        }
    }

    /// Key while still registered
    pub fn key(&self) -> Option<DisposableKey> {
        self.key.lock().ok().and_then(|key| *key)
    }

    /// Remove the entry from the registry (idempotent)
    pub fn release(&self) {
        let key = match self.key.lock() {
            Ok(mut key) => key.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let (Some(key), Some(shared)) = (key, self.registry.upgrade()) {
            shared.registry().unregister(key);
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
#[path = "disposal_registry_tests.rs"]
mod tests;
