//! Reactive Runtime
//!
//! The runtime is the per-compiler state container that connects observed
//! model properties with the watchers reading them. Every observed node and
//! every watcher holds the `Rc<Runtime>` it was created with, so two
//! compilers never share a context stack or a watcher registry.
//!
//! # How It Works
//!
//! 1. A watcher enters the runtime's context before running its getter.
//!
//! 2. Observed property getters call [`Runtime::track`], which subscribes
//!    the current watcher to the property's registry.
//!
//! 3. Property setters call `Dep::notify` directly; the runtime is not
//!    involved in propagation, which stays synchronous.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::context::{ContextGuard, ReactiveContext};
use super::dep::Dep;
use super::subscriber::WatcherId;
use super::watcher::Watcher;

/// Per-compiler reactive state.
#[derive(Default)]
pub struct Runtime {
    context: ReactiveContext,
    /// Live watchers, for teardown accounting.
    watchers: RefCell<IndexMap<WatcherId, Weak<Watcher>>>,
}

impl Runtime {
    /// Create a fresh runtime.
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Enter the evaluation context of `watcher`.
    pub fn enter(&self, watcher_id: WatcherId, watcher: Weak<Watcher>) -> ContextGuard<'_> {
        self.context.enter(watcher_id, watcher)
    }

    /// Record that the current watcher read `dep`.
    pub fn track(&self, dep: &Rc<Dep>) {
        self.context.track_dependency(dep);
    }

    /// Get the watcher currently evaluating, if any.
    pub fn current_watcher(&self) -> Option<WatcherId> {
        self.context.current_watcher()
    }

    /// Check if we're inside a watcher evaluation.
    pub fn is_tracking(&self) -> bool {
        self.context.is_active()
    }

    pub(crate) fn register(&self, id: WatcherId, watcher: Weak<Watcher>) {
        self.watchers.borrow_mut().insert(id, watcher);
    }

    pub(crate) fn unregister(&self, id: WatcherId) {
        self.watchers.borrow_mut().shift_remove(&id);
    }

    /// Number of watchers that have not been torn down.
    pub fn active_watchers(&self) -> usize {
        self.watchers
            .borrow()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("tracking", &self.is_tracking())
            .field("active_watchers", &self.active_watchers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::Data;

    #[test]
    fn runtime_registers_and_unregisters() {
        let runtime = Runtime::new();
        let watcher = Watcher::new(&runtime, "1", || Ok(Data::Number(1.0)), |_, _| {});

        assert_eq!(runtime.active_watchers(), 1);

        watcher.teardown();
        assert_eq!(runtime.active_watchers(), 0);
    }

    #[test]
    fn dropped_watchers_are_not_counted() {
        let runtime = Runtime::new();
        let watcher = Watcher::new(&runtime, "1", || Ok(Data::Null), |_, _| {});
        drop(watcher);
        assert_eq!(runtime.active_watchers(), 0);
    }

    #[test]
    fn track_outside_evaluation_is_noop() {
        let runtime = Runtime::new();
        let dep = Dep::new();
        runtime.track(&dep);
        assert!(!runtime.is_tracking());
        assert_eq!(dep.subscriber_count(), 0);
    }
}
