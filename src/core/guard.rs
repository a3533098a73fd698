//! Reentrancy guard: per-kind "applying remote change" flags
//!
//! While a flag is set, host notifications of that kind come from our own
//! inbound apply and must not be captured as local intent.

use std::cell::Cell;

use crate::types::ResourceKind;

/// One flag per resource kind, single-threaded
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    applying: [Cell<bool>; 5],
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_apply(&self, kind: ResourceKind) {
        self.applying[kind.index()].set(true);
    }

    pub fn end_apply(&self, kind: ResourceKind) {
        self.applying[kind.index()].set(false);
    }

    pub fn should_suppress_capture(&self, kind: ResourceKind) -> bool {
        self.applying[kind.index()].get()
    }

    /// Set the flag for `kind` until the returned scope is dropped
    pub fn scope(&self, kind: ResourceKind) -> ApplyScope<'_> {
        self.begin_apply(kind);
        ApplyScope { guard: self, kind }
    }

    /// Clear every flag
    pub fn reset(&self) {
        for flag in &self.applying {
            flag.set(false);
        }
    }
}

/// Clears its flag on drop, including during unwinding
#[derive(Debug)]
pub struct ApplyScope<'a> {
    guard: &'a ReentrancyGuard,
    kind: ResourceKind,
}

impl Drop for ApplyScope<'_> {
    fn drop(&mut self) {
        self.guard.end_apply(self.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn test_flags_start_clear() {
        let guard = ReentrancyGuard::new();
        for kind in ResourceKind::ALL {
            assert!(!guard.should_suppress_capture(kind));
        }
    }

    #[test]
    fn test_begin_end_pairs() {
        let guard = ReentrancyGuard::new();
        guard.begin_apply(ResourceKind::Funds);
        assert!(guard.should_suppress_capture(ResourceKind::Funds));
        assert!(!guard.should_suppress_capture(ResourceKind::Science));
        guard.end_apply(ResourceKind::Funds);
        assert!(!guard.should_suppress_capture(ResourceKind::Funds));
    }

    #[test]
    fn test_scope_clears_on_drop() {
        let guard = ReentrancyGuard::new();
        {
            let _scope = guard.scope(ResourceKind::Contract);
            assert!(guard.should_suppress_capture(ResourceKind::Contract));
        }
        assert!(!guard.should_suppress_capture(ResourceKind::Contract));
    }

    #[test]
    fn test_scope_clears_on_panic() {
        let guard = ReentrancyGuard::new();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _scope = guard.scope(ResourceKind::Reputation);
            panic!("apply failed");
        }));
        assert!(result.is_err());
        assert!(!guard.should_suppress_capture(ResourceKind::Reputation));
    }
}
