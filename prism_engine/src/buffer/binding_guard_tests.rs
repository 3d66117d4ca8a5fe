//! Unit tests for BindingGuard against an in-memory binding table

use crate::buffer::{BindingGuard, BindingState, BindingTarget};
use std::cell::RefCell;
use std::collections::HashMap;

/// Binding table that records every bind call
struct RecordingBindings {
    bound: RefCell<HashMap<BindingTarget, u32>>,
    calls: RefCell<Vec<(BindingTarget, Option<u32>)>>,
}

impl RecordingBindings {
    fn new() -> Self {
        Self {
            bound: RefCell::new(HashMap::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl BindingState for RecordingBindings {
    type Handle = u32;

    fn bound_buffer(&self, target: BindingTarget) -> Option<u32> {
        self.bound.borrow().get(&target).copied()
    }

    fn bind_buffer(&self, target: BindingTarget, handle: Option<u32>) {
        self.calls.borrow_mut().push((target, handle));
        match handle {
            Some(handle) => self.bound.borrow_mut().insert(target, handle),
            None => self.bound.borrow_mut().remove(&target),
        };
    }
}

#[test]
fn test_guard_restores_previous_binding() {
    let bindings = RecordingBindings::new();
    bindings.bind_buffer(BindingTarget::Array, Some(1));

    {
        let guard = BindingGuard::bind(&bindings, BindingTarget::Array, 2);
        assert_eq!(guard.previous(), Some(1));
        assert_eq!(bindings.bound_buffer(BindingTarget::Array), Some(2));
    }

    assert_eq!(bindings.bound_buffer(BindingTarget::Array), Some(1));
}

#[test]
fn test_guard_restores_unbound_state() {
    let bindings = RecordingBindings::new();

    {
        let _guard = BindingGuard::bind(&bindings, BindingTarget::CopyRead, 5);
        assert_eq!(bindings.bound_buffer(BindingTarget::CopyRead), Some(5));
    }

    assert_eq!(bindings.bound_buffer(BindingTarget::CopyRead), None);
}

#[test]
fn test_guard_skips_redundant_binds() {
    let bindings = RecordingBindings::new();
    bindings.bind_buffer(BindingTarget::Uniform, Some(3));
    let before = bindings.call_count();

    {
        let _guard = BindingGuard::bind(&bindings, BindingTarget::Uniform, 3);
    }

    assert_eq!(bindings.call_count(), before);
}

#[test]
fn test_nested_guards_on_distinct_targets() {
    let bindings = RecordingBindings::new();
    bindings.bind_buffer(BindingTarget::CopyWrite, Some(9));

    {
        let _write = BindingGuard::bind(&bindings, BindingTarget::CopyWrite, 1);
        let _read = BindingGuard::bind(&bindings, BindingTarget::CopyRead, 2);
        assert_eq!(bindings.bound_buffer(BindingTarget::CopyWrite), Some(1));
        assert_eq!(bindings.bound_buffer(BindingTarget::CopyRead), Some(2));
    }

    assert_eq!(bindings.bound_buffer(BindingTarget::CopyWrite), Some(9));
    assert_eq!(bindings.bound_buffer(BindingTarget::CopyRead), None);
}

#[test]
fn test_guard_restores_on_error_path() {
    fn failing_operation(bindings: &RecordingBindings) -> Result<(), String> {
        let _guard = BindingGuard::bind(bindings, BindingTarget::ElementArray, 4);
        Err("driver refused".to_string())
    }

    let bindings = RecordingBindings::new();
    bindings.bind_buffer(BindingTarget::ElementArray, Some(8));

    assert!(failing_operation(&bindings).is_err());
    assert_eq!(bindings.bound_buffer(BindingTarget::ElementArray), Some(8));
}
