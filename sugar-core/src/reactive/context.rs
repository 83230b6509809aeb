//! Reactive Context
//!
//! The reactive context tracks which watcher is currently evaluating.
//! This enables automatic dependency tracking: when an observed property is
//! read, the current watcher is subscribed to that property's registry.
//!
//! # Implementation
//!
//! Each [`Runtime`](super::Runtime) owns one context stack. Entering a
//! watcher evaluation pushes an entry; the returned guard pops it. Nested
//! evaluations (a computed property recomputing while a directive watcher
//! reads it) push on top and restore the outer entry when they finish.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::dep::Dep;
use super::subscriber::{DepId, WatcherId};
use super::watcher::Watcher;

/// An entry in the reactive context stack.
struct ContextEntry {
    /// The watcher being evaluated.
    watcher_id: WatcherId,
    watcher: Weak<Watcher>,
    /// Registries read during this evaluation, in first-read order.
    dependencies: IndexMap<DepId, Rc<Dep>>,
}

/// Stack of in-progress watcher evaluations.
#[derive(Default)]
pub struct ReactiveContext {
    stack: RefCell<Vec<ContextEntry>>,
}

impl ReactiveContext {
    /// Create an empty context stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a new reactive context for the given watcher.
    ///
    /// The context is exited when the returned guard is dropped or
    /// finished.
    pub fn enter(&self, watcher_id: WatcherId, watcher: Weak<Watcher>) -> ContextGuard<'_> {
        self.stack.borrow_mut().push(ContextEntry {
            watcher_id,
            watcher,
            dependencies: IndexMap::new(),
        });

        ContextGuard {
            context: self,
            watcher_id,
            finished: false,
        }
    }

    /// Check if there is an active reactive context.
    pub fn is_active(&self) -> bool {
        !self.stack.borrow().is_empty()
    }

    /// Get the current watcher ID, if any.
    pub fn current_watcher(&self) -> Option<WatcherId> {
        self.stack.borrow().last().map(|entry| entry.watcher_id)
    }

    /// Record a read of `dep` and subscribe the current watcher to it.
    ///
    /// Reads outside any evaluation are ignored.
    pub fn track_dependency(&self, dep: &Rc<Dep>) {
        let subscription = {
            let mut stack = self.stack.borrow_mut();
            let Some(entry) = stack.last_mut() else {
                return;
            };
            if entry.dependencies.contains_key(&dep.id()) {
                return;
            }
            entry.dependencies.insert(dep.id(), dep.clone());
            (entry.watcher_id, entry.watcher.clone())
        };

        dep.subscribe(subscription.0, subscription.1);
    }

    fn pop(&self, watcher_id: WatcherId) -> IndexMap<DepId, Rc<Dep>> {
        let popped = self.stack.borrow_mut().pop();

        match popped {
            Some(entry) => {
                debug_assert_eq!(
                    entry.watcher_id, watcher_id,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    watcher_id, entry.watcher_id
                );
                entry.dependencies
            }
            None => IndexMap::new(),
        }
    }
}

/// Guard that pops the context when dropped.
///
/// This ensures the context stack is restored even if the getter panics.
pub struct ContextGuard<'a> {
    context: &'a ReactiveContext,
    watcher_id: WatcherId,
    finished: bool,
}

impl ContextGuard<'_> {
    /// Exit the context and return the registries read while it was active.
    pub fn finish(mut self) -> IndexMap<DepId, Rc<Dep>> {
        self.finished = true;
        self.context.pop(self.watcher_id)
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.context.pop(self.watcher_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tracks_watcher() {
        let context = ReactiveContext::new();
        let id = WatcherId::new();

        assert!(!context.is_active());
        assert!(context.current_watcher().is_none());

        {
            let _guard = context.enter(id, Weak::new());

            assert!(context.is_active());
            assert_eq!(context.current_watcher(), Some(id));
        }

        // Context should be cleaned up after drop
        assert!(!context.is_active());
        assert!(context.current_watcher().is_none());
    }

    #[test]
    fn context_collects_unique_dependencies() {
        let context = ReactiveContext::new();
        let guard = context.enter(WatcherId::new(), Weak::new());

        let a = Dep::new();
        let b = Dep::new();
        context.track_dependency(&a);
        context.track_dependency(&b);
        context.track_dependency(&a);

        let deps = guard.finish();
        let ids: Vec<DepId> = deps.keys().copied().collect();
        assert_eq!(ids, vec![a.id(), b.id()]);
        assert!(!context.is_active());
    }

    #[test]
    fn nested_contexts_restore_outer() {
        let context = ReactiveContext::new();
        let id1 = WatcherId::new();
        let id2 = WatcherId::new();
        let outer_dep = Dep::new();
        let inner_dep = Dep::new();

        let outer = context.enter(id1, Weak::new());
        context.track_dependency(&outer_dep);
        {
            let inner = context.enter(id2, Weak::new());
            assert_eq!(context.current_watcher(), Some(id2));
            context.track_dependency(&inner_dep);
            let inner_deps = inner.finish();
            assert!(inner_deps.contains_key(&inner_dep.id()));
            assert!(!inner_deps.contains_key(&outer_dep.id()));
        }

        // After inner context finishes, outer should be current
        assert_eq!(context.current_watcher(), Some(id1));
        let outer_deps = outer.finish();
        assert_eq!(outer_deps.len(), 1);
        assert!(context.current_watcher().is_none());
    }

    #[test]
    fn reads_outside_context_are_ignored() {
        let context = ReactiveContext::new();
        let dep = Dep::new();
        context.track_dependency(&dep);
        assert_eq!(dep.subscriber_count(), 0);
    }
}
