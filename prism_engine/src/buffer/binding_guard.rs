//! Scoped save/restore of buffer bindings
//!
//! The buffer bound at a target is context state visible to the caller.
//! Every bind performed by a provider goes through [`BindingGuard`], which
//! records the prior binding and puts it back when dropped, on success and
//! error paths alike.

use crate::buffer::BindingTarget;

/// Backend state holding "the buffer bound at target X"
pub trait BindingState {
    /// Native handle type
    type Handle: Copy + PartialEq + std::fmt::Debug;

    /// Buffer currently bound at `target` (in the current context)
    fn bound_buffer(&self, target: BindingTarget) -> Option<Self::Handle>;

    /// Bind `handle` at `target` (`None` unbinds)
    fn bind_buffer(&self, target: BindingTarget, handle: Option<Self::Handle>);
}

/// Binds a buffer for the guard's lifetime, then restores the previous one
#[must_use = "the previous binding is restored as soon as the guard is dropped"]
pub struct BindingGuard<'a, S: BindingState + ?Sized> {
    state: &'a S,
    target: BindingTarget,
    previous: Option<S::Handle>,
}

impl<'a, S: BindingState + ?Sized> BindingGuard<'a, S> {
    /// Save the binding at `target` and bind `handle` in its place
    pub fn bind(state: &'a S, target: BindingTarget, handle: S::Handle) -> Self {
        let previous = state.bound_buffer(target);
        if previous != Some(handle) {
            state.bind_buffer(target, Some(handle));
        }
        Self {
            state,
            target,
            previous,
        }
    }

    pub fn target(&self) -> BindingTarget {
        self.target
    }

    /// Binding that will be restored
    pub fn previous(&self) -> Option<S::Handle> {
        self.previous
    }
}

impl<S: BindingState + ?Sized> Drop for BindingGuard<'_, S> {
    fn drop(&mut self) {
        if self.state.bound_buffer(self.target) != self.previous {
            self.state.bind_buffer(self.target, self.previous);
        }
    }
}

#[cfg(test)]
#[path = "binding_guard_tests.rs"]
mod tests;
