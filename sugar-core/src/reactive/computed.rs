//! Computed Properties
//!
//! A computed property is a derived, memoized accessor installed on the
//! root model object.
//!
//! # How Computed Properties Work
//!
//! 1. Each property is backed by a lazy [`Watcher`] whose getter is the
//!    user function. Nothing runs at installation time.
//!
//! 2. A read subscribes the reader to the property's own [`Dep`], then
//!    recomputes only if the watcher is dirty. The recomputation runs in a
//!    nested context entry, so the reader depends on the property and the
//!    property depends on the model fields it reads.
//!
//! 3. When one of those fields changes, the lazy watcher is marked dirty and
//!    the property's dependents are notified; they re-read and trigger the
//!    recomputation.
//!
//! Writes are rejected unless a setter was supplied.

use std::rc::Rc;

use super::dep::Dep;
use super::runtime::Runtime;
use super::watcher::Watcher;
use crate::error::ModelError;
use crate::observer::{Data, Model, Value, WeakObjectRef};

/// User getter for a computed property.
pub type ComputedGetter = Rc<dyn Fn(&Model) -> Value>;

/// Optional user setter for a computed property.
pub type ComputedSetter = Rc<dyn Fn(&Model, Value)>;

/// A memoized accessor on the model.
pub struct ComputedProperty {
    name: String,
    runtime: Rc<Runtime>,
    watcher: Rc<Watcher>,

    /// Watchers that read this property.
    dependents: Rc<Dep>,

    setter: Option<ComputedSetter>,

    /// Weak so the model does not keep itself alive through its own accessor.
    model: WeakObjectRef,
}

impl ComputedProperty {
    pub(crate) fn new(name: &str, model: &Model, getter: ComputedGetter, setter: Option<ComputedSetter>) -> Rc<Self> {
        let runtime = model.runtime().clone();
        let dependents = Dep::new();
        let weak_model = model.root().downgrade();

        let getter_model = weak_model.clone();
        let getter_runtime = runtime.clone();
        let watcher = Watcher::lazy(
            &runtime,
            name,
            move || {
                let Some(root) = getter_model.upgrade() else {
                    return Ok(Data::Null);
                };
                let value = getter(&Model::new(root));
                Ok(Data::from_value(value, &getter_runtime))
            },
            dependents.clone(),
        );

        Rc::new(Self {
            name: name.to_string(),
            runtime,
            watcher,
            dependents,
            setter,
            model: weak_model,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the value, recomputing if a dependency changed since the last read.
    pub fn get(&self) -> Data {
        self.runtime.track(&self.dependents);

        if self.watcher.is_dirty() {
            self.watcher.evaluate();
        }
        self.watcher.value()
    }

    /// Write through the setter, if there is one.
    pub fn set(&self, value: Data) -> Result<(), ModelError> {
        let Some(setter) = &self.setter else {
            tracing::warn!(property = %self.name, "write to read-only computed property ignored");
            return Err(ModelError::ReadOnly(self.name.clone()));
        };

        if let Some(root) = self.model.upgrade() {
            setter(&Model::new(root), value.to_value());
        }
        Ok(())
    }

    /// Whether the next read will recompute.
    pub fn is_dirty(&self) -> bool {
        self.watcher.is_dirty()
    }

    /// Number of successful recomputations.
    pub fn compute_count(&self) -> usize {
        self.watcher.run_count()
    }

    /// Get the number of dependents.
    pub fn dependent_count(&self) -> usize {
        self.dependents.subscriber_count()
    }
}

impl std::fmt::Debug for ComputedProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputedProperty")
            .field("name", &self.name)
            .field("dirty", &self.is_dirty())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::Observer;
    use serde_json::json;
    use std::cell::Cell;

    fn model(json: serde_json::Value) -> Model {
        Observer::new(&Runtime::new())
            .observe_model(Value::from(json))
            .unwrap()
    }

    fn full_name(calls: &Rc<Cell<u32>>) -> ComputedGetter {
        let calls = calls.clone();
        Rc::new(move |model: &Model| {
            calls.set(calls.get() + 1);
            let first = model.get("first").unwrap_or_default().to_display();
            let last = model.get("last").unwrap_or_default().to_display();
            Value::from(format!("{first} {last}"))
        })
    }

    #[test]
    fn computes_on_first_read_and_caches() {
        let model = model(json!({"first": "Ada", "last": "Lovelace"}));
        let calls = Rc::new(Cell::new(0));
        model.define_computed("fullName", full_name(&calls), None);

        assert_eq!(calls.get(), 0);
        assert_eq!(model.get("fullName").unwrap().as_str(), Some("Ada Lovelace"));
        assert_eq!(model.get("fullName").unwrap().as_str(), Some("Ada Lovelace"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn recomputes_after_dependency_change() {
        let model = model(json!({"first": "Ada", "last": "Lovelace"}));
        let calls = Rc::new(Cell::new(0));
        model.define_computed("fullName", full_name(&calls), None);
        let _ = model.get("fullName");

        model.set("last", "Byron").unwrap();
        assert_eq!(calls.get(), 1, "recomputation is lazy");
        assert_eq!(model.get("fullName").unwrap().as_str(), Some("Ada Byron"));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn watchers_on_computed_are_notified() {
        let model = model(json!({"first": "Ada", "last": "Lovelace"}));
        let calls = Rc::new(Cell::new(0));
        model.define_computed("fullName", full_name(&calls), None);

        let seen = Rc::new(std::cell::RefCell::new(String::new()));
        let sink = seen.clone();
        let reader = model.clone();
        let _watcher = Watcher::new(
            model.runtime(),
            "fullName",
            move || Ok(reader.get("fullName").unwrap_or_default()),
            move |new, _| *sink.borrow_mut() = new.to_display(),
        );

        model.set("first", "Augusta").unwrap();
        assert_eq!(*seen.borrow(), "Augusta Lovelace");
    }

    #[test]
    fn writes_without_setter_are_rejected() {
        let model = model(json!({"first": "Ada", "last": "Lovelace"}));
        let calls = Rc::new(Cell::new(0));
        model.define_computed("fullName", full_name(&calls), None);

        assert_eq!(
            model.set("fullName", "x").unwrap_err(),
            ModelError::ReadOnly("fullName".into())
        );
    }

    #[test]
    fn writes_go_through_setter() {
        let model = model(json!({"first": "Ada", "last": "Lovelace"}));
        let calls = Rc::new(Cell::new(0));
        let setter: ComputedSetter = Rc::new(|model: &Model, value: Value| {
            let text = value.as_str().unwrap_or_default().to_string();
            let mut parts = text.splitn(2, ' ');
            let _ = model.set("first", parts.next().unwrap_or_default());
            let _ = model.set("last", parts.next().unwrap_or_default());
        });
        model.define_computed("fullName", full_name(&calls), Some(setter));

        model.set("fullName", "Grace Hopper").unwrap();
        assert_eq!(model.get("first").unwrap().as_str(), Some("Grace"));
        assert_eq!(model.get("fullName").unwrap().as_str(), Some("Grace Hopper"));
    }
}
