//! Watcher Implementation
//!
//! A Watcher pairs a getter over the model with an update callback. It is
//! the reactive unit every directive is built on.
//!
//! # How Watchers Work
//!
//! 1. When created, the watcher runs its getter once to establish initial
//!    dependencies and its initial value. The callback is not invoked; the
//!    owning directive performs the initial render itself.
//!
//! 2. When any dependency notifies, the watcher re-runs its getter inside a
//!    fresh context entry and rebuilds its dependency set. Registries that
//!    were not read this time are unsubscribed, so `a ? b : c` follows
//!    whichever branch is live.
//!
//! 3. The callback runs with `(new, old)` only if the value changed: deep
//!    comparison for objects and arrays, strict identity otherwise. A
//!    different container with equal contents still counts as a change,
//!    since bindings below it hold on to the old one.
//!
//! # Lazy Watchers
//!
//! Computed properties use a lazy watcher. A notification only marks it
//! dirty and forwards the notification to the computed property's own
//! dependents; the getter runs on the next read.
//!
//! # Teardown
//!
//! [`Watcher::teardown`] unsubscribes from every registry and drops the
//! callback. A torn down watcher ignores notifications already in flight.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::dep::Dep;
use super::runtime::Runtime;
use super::subscriber::{DepId, WatcherId};
use crate::error::ExprError;
use crate::observer::{Data, Value};

/// Getter evaluated inside the watcher's tracking context.
pub type Getter = Box<dyn Fn() -> Result<Data, ExprError>>;

/// Update callback, invoked with `(new, old)`.
pub type Callback = Rc<dyn Fn(&Data, &Data)>;

enum Mode {
    Eager,
    Lazy { dirty: Cell<bool>, dependents: Rc<Dep> },
}

/// A getter/callback pair re-run on dependency change.
pub struct Watcher {
    id: WatcherId,
    this: Weak<Watcher>,
    runtime: Rc<Runtime>,

    /// Source text of the expression, for diagnostics.
    expression: String,

    getter: Getter,
    callback: RefCell<Option<Callback>>,

    /// Last computed value and, for containers, its deep snapshot.
    value: RefCell<Data>,
    snapshot: RefCell<Option<Value>>,

    /// Registries this watcher is subscribed to.
    deps: RefCell<IndexMap<DepId, Rc<Dep>>>,

    mode: Mode,
    active: Cell<bool>,
    run_count: Cell<usize>,
}

impl Watcher {
    /// Create a watcher and evaluate it once.
    pub fn new<G, C>(runtime: &Rc<Runtime>, expression: impl Into<String>, getter: G, callback: C) -> Rc<Self>
    where
        G: Fn() -> Result<Data, ExprError> + 'static,
        C: Fn(&Data, &Data) + 'static,
    {
        let watcher = Self::build(runtime, expression.into(), Box::new(getter), Some(Rc::new(callback)), Mode::Eager);
        watcher.run(false);
        watcher
    }

    /// Create a lazy watcher that forwards notifications to `dependents`.
    ///
    /// The getter does not run until the first [`evaluate`](Self::evaluate).
    pub fn lazy<G>(runtime: &Rc<Runtime>, expression: impl Into<String>, getter: G, dependents: Rc<Dep>) -> Rc<Self>
    where
        G: Fn() -> Result<Data, ExprError> + 'static,
    {
        let mode = Mode::Lazy {
            dirty: Cell::new(true),
            dependents,
        };
        Self::build(runtime, expression.into(), Box::new(getter), None, mode)
    }

    fn build(runtime: &Rc<Runtime>, expression: String, getter: Getter, callback: Option<Callback>, mode: Mode) -> Rc<Self> {
        let watcher = Rc::new_cyclic(|this| Self {
            id: WatcherId::new(),
            this: this.clone(),
            runtime: runtime.clone(),
            expression,
            getter,
            callback: RefCell::new(callback),
            value: RefCell::new(Data::Null),
            snapshot: RefCell::new(None),
            deps: RefCell::new(IndexMap::new()),
            mode,
            active: Cell::new(true),
            run_count: Cell::new(0),
        });
        runtime.register(watcher.id, Rc::downgrade(&watcher));
        watcher
    }

    /// Get the watcher's unique ID.
    pub fn id(&self) -> WatcherId {
        self.id
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Get the last computed value.
    pub fn value(&self) -> Data {
        self.value.borrow().clone()
    }

    /// React to a dependency notification.
    pub fn update(&self) {
        if !self.active.get() {
            return;
        }

        match &self.mode {
            Mode::Eager => {
                self.run(true);
            }
            Mode::Lazy { dirty, dependents } => {
                dirty.set(true);
                dependents.notify();
            }
        }
    }

    /// Re-run the getter now. Returns whether the value changed.
    pub fn evaluate(&self) -> bool {
        self.run(matches!(self.mode, Mode::Eager))
    }

    fn run(&self, invoke_callback: bool) -> bool {
        if !self.active.get() {
            return false;
        }

        let guard = self.runtime.enter(self.id, self.this.clone());
        let result = (self.getter)();
        let deps = guard.finish();
        self.replace_dependencies(deps);

        if let Mode::Lazy { dirty, .. } = &self.mode {
            dirty.set(false);
        }

        let new_value = match result {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(expression = %self.expression, %error, "expression evaluation failed");
                return false;
            }
        };

        let first_run = self.run_count.get() == 0;
        self.run_count.set(self.run_count.get() + 1);

        let new_snapshot = match &new_value {
            Data::Object(_) | Data::Array(_) => Some(new_value.to_value()),
            _ => None,
        };
        // A fresh container is a change even when deep-equal to the last one.
        let changed = match &new_snapshot {
            Some(snapshot) => {
                !self.value.borrow().same(&new_value) || self.snapshot.borrow().as_ref() != Some(snapshot)
            }
            None => !self.value.borrow().same(&new_value),
        };

        if !changed && !first_run {
            return false;
        }

        let old_value = self.value.replace(new_value.clone());
        *self.snapshot.borrow_mut() = new_snapshot;

        if invoke_callback && !first_run {
            let callback = self.callback.borrow().clone();
            if let Some(callback) = callback {
                callback(&new_value, &old_value);
            }
        }
        changed
    }

    /// Swap in the dependency set of the latest run, dropping stale ones.
    fn replace_dependencies(&self, new_deps: IndexMap<DepId, Rc<Dep>>) {
        if !self.active.get() {
            // Torn down while the getter was running.
            for dep in new_deps.values() {
                dep.unsubscribe(self.id);
            }
            return;
        }

        let mut deps = self.deps.borrow_mut();
        for (id, dep) in deps.iter() {
            if !new_deps.contains_key(id) {
                dep.unsubscribe(self.id);
            }
        }
        *deps = new_deps;
    }

    /// Detach from every registry. Further notifications are ignored.
    pub fn teardown(&self) {
        if !self.active.replace(false) {
            return;
        }

        for dep in self.deps.borrow_mut().drain(..).map(|(_, dep)| dep) {
            dep.unsubscribe(self.id);
        }
        self.callback.borrow_mut().take();
        self.runtime.unregister(self.id);
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Whether a lazy watcher needs to re-run. Eager watchers are never dirty.
    pub fn is_dirty(&self) -> bool {
        match &self.mode {
            Mode::Eager => false,
            Mode::Lazy { dirty, .. } => dirty.get(),
        }
    }

    /// Get the number of times the getter ran successfully.
    pub fn run_count(&self) -> usize {
        self.run_count.get()
    }

    /// Get the number of registries this watcher is subscribed to.
    pub fn dependency_count(&self) -> usize {
        self.deps.borrow().len()
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.id)
            .field("expression", &self.expression)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("active", &self.is_active())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{Model, Observer};
    use serde_json::json;
    use std::cell::RefCell;

    fn model(json: serde_json::Value) -> Model {
        Observer::new(&Runtime::new())
            .observe_model(Value::from(json))
            .unwrap()
    }

    fn recording(model: &Model, path: &'static str) -> (Rc<Watcher>, Rc<RefCell<Vec<(String, String)>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let log = calls.clone();
        let reader = model.clone();
        let watcher = Watcher::new(
            model.runtime(),
            path,
            move || Ok(reader.get(path).unwrap_or_default()),
            move |new, old| log.borrow_mut().push((new.to_display(), old.to_display())),
        );
        (watcher, calls)
    }

    #[test]
    fn watcher_evaluates_on_creation_without_callback() {
        let model = model(json!({"a": 1}));
        let (watcher, calls) = recording(&model, "a");

        assert_eq!(watcher.value().as_number(), Some(1.0));
        assert_eq!(watcher.run_count(), 1);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn callback_receives_new_and_old() {
        let model = model(json!({"a": 1}));
        let (_watcher, calls) = recording(&model, "a");

        model.set("a", 2).unwrap();
        assert_eq!(*calls.borrow(), vec![("2".to_string(), "1".to_string())]);
    }

    #[test]
    fn dependencies_follow_the_live_branch() {
        let model = model(json!({"flag": true, "b": "b", "c": "c"}));
        let reader = model.clone();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let watcher = Watcher::new(
            model.runtime(),
            "flag ? b : c",
            move || {
                let flag = reader.get("flag").unwrap_or_default();
                let branch = if flag.truthy() { "b" } else { "c" };
                Ok(reader.get(branch).unwrap_or_default())
            },
            move |_, _| counter.set(counter.get() + 1),
        );

        assert_eq!(watcher.dependency_count(), 2);
        model.set("c", "c2").unwrap();
        assert_eq!(hits.get(), 0);

        model.set("flag", false).unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(watcher.value().as_str(), Some("c2"));

        // `b` is no longer a dependency.
        let b_dep = model.root().property_dep("b").unwrap();
        assert!(!b_dep.has_subscriber(watcher.id()));
        model.set("b", "b2").unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn array_results_compare_deeply() {
        let model = model(json!({"items": [1, 2]}));
        let (_watcher, calls) = recording(&model, "items");

        model.array("items").unwrap().push(3);
        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(calls.borrow()[0].0, "[1,2,3]");
    }

    #[test]
    fn replacing_a_container_is_a_change() {
        let model = model(json!({"items": [1, 2]}));
        let (_watcher, calls) = recording(&model, "items");

        model.set("items", Value::from(json!([1, 2]))).unwrap();
        assert_eq!(calls.borrow().len(), 1);

        // Same container, same contents.
        let items = model.get("items").unwrap();
        model.set_data("items", items).unwrap();
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn failed_evaluation_keeps_previous_value() {
        let model = model(json!({"fail": false, "n": 1}));
        let reader = model.clone();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let watcher = Watcher::new(
            model.runtime(),
            "n",
            move || {
                if reader.get("fail").unwrap_or_default().truthy() {
                    return Err(ExprError::Runtime("boom".into()));
                }
                Ok(reader.get("n").unwrap_or_default())
            },
            move |_, _| counter.set(counter.get() + 1),
        );

        model.set("fail", true).unwrap();
        assert_eq!(hits.get(), 0);
        assert_eq!(watcher.value().as_number(), Some(1.0));

        // Still subscribed to `fail`, so it recovers.
        model.set("fail", false).unwrap();
        assert_eq!(watcher.value().as_number(), Some(1.0));
        model.set("n", 5).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn teardown_detaches_from_all_registries() {
        let model = model(json!({"a": 1}));
        let (watcher, calls) = recording(&model, "a");
        let dep = model.root().property_dep("a").unwrap();
        assert_eq!(dep.subscriber_count(), 1);

        watcher.teardown();
        assert_eq!(dep.subscriber_count(), 0);
        assert!(!watcher.is_active());

        model.set("a", 2).unwrap();
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn teardown_mid_notification_skips_pending_watcher() {
        let model = model(json!({"a": 1}));
        let slot: Rc<RefCell<Option<Rc<Watcher>>>> = Rc::new(RefCell::new(None));
        let victim = slot.clone();
        let reader = model.clone();
        let _first = Watcher::new(
            model.runtime(),
            "a",
            move || Ok(reader.get("a").unwrap_or_default()),
            move |_, _| {
                if let Some(watcher) = victim.borrow().as_ref() {
                    watcher.teardown();
                }
            },
        );
        let (second, second_calls) = recording(&model, "a");
        *slot.borrow_mut() = Some(second.clone());

        // `second` is still in the notification snapshot when `_first`
        // tears it down, and must not run.
        model.set("a", 2).unwrap();
        assert!(second_calls.borrow().is_empty());
        assert!(!second.is_active());
    }

    #[test]
    fn lazy_watcher_marks_dirty_and_forwards() {
        let model = model(json!({"a": 1}));
        let dependents = Dep::new();
        let reader = model.clone();
        let lazy = Watcher::lazy(
            model.runtime(),
            "a",
            move || Ok(reader.get("a").unwrap_or_default()),
            dependents.clone(),
        );

        assert!(lazy.is_dirty());
        lazy.evaluate();
        assert!(!lazy.is_dirty());
        assert_eq!(lazy.value().as_number(), Some(1.0));

        model.set("a", 2).unwrap();
        assert!(lazy.is_dirty());
        assert_eq!(lazy.value().as_number(), Some(1.0));
    }
}
