//! Observed Data
//!
//! [`Data`] is the instrumented counterpart of [`Value`]. Scalars are held
//! inline; objects and arrays are shared nodes (`Rc`) so that two paths
//! reaching the same object see the same properties, exactly like object
//! references in the model graph they mirror.
//!
//! # Dependency Tracking
//!
//! Each object property owns a [`Dep`]. Each object and array node also owns
//! a [`Dep`] for the container as a whole. Reading a property inside a
//! watcher evaluation subscribes the watcher to the property's registry and,
//! when the property holds a container, to the container's registry too.
//! That second subscription is what makes array mutators observable by
//! anyone who read the array through its parent.
//!
//! # Limitations
//!
//! Writing a key that did not exist when the object was observed stores a
//! plain, untracked property. Writing at the end of an array appends
//! without notification; writes further out are rejected. [`ObjectRef::define`] is the explicit way to add a
//! reactive property after observation.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::value::Value;
use crate::error::ModelError;
use crate::reactive::{ComputedProperty, Dep, Runtime};

/// An observed value.
#[derive(Clone, Default)]
pub enum Data {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(ObjectRef),
    Array(ArrayRef),
}

impl Data {
    /// Observe a plain value, creating reactive nodes bound to `runtime`.
    pub fn from_value(value: Value, runtime: &Rc<Runtime>) -> Data {
        match value {
            Value::Null => Data::Null,
            Value::Bool(b) => Data::Bool(b),
            Value::Number(n) => Data::Number(n),
            Value::String(s) => Data::String(Rc::from(s)),
            Value::Array(items) => Data::Array(ArrayRef::from_values(items, runtime)),
            Value::Object(map) => Data::Object(ObjectRef::from_values(map, runtime)),
        }
    }

    /// Build a string datum.
    pub fn string(s: impl AsRef<str>) -> Data {
        Data::String(Rc::from(s.as_ref()))
    }

    /// Strict identity: scalars compare by value, containers by reference.
    pub fn same(&self, other: &Data) -> bool {
        match (self, other) {
            (Data::Null, Data::Null) => true,
            (Data::Bool(a), Data::Bool(b)) => a == b,
            (Data::Number(a), Data::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Data::String(a), Data::String(b)) => a == b,
            (Data::Object(a), Data::Object(b)) => a.ptr_eq(b),
            (Data::Array(a), Data::Array(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Deep, untracked copy of the current state.
    ///
    /// Computed properties are accessors and are left out.
    pub fn to_value(&self) -> Value {
        match self {
            Data::Null => Value::Null,
            Data::Bool(b) => Value::Bool(*b),
            Data::Number(n) => Value::Number(*n),
            Data::String(s) => Value::String(s.to_string()),
            Data::Object(object) => object.to_value(),
            Data::Array(array) => array.to_value(),
        }
    }

    /// Boolean coercion: `null`, `false`, `0`, `NaN` and `""` are falsy.
    pub fn truthy(&self) -> bool {
        match self {
            Data::Null => false,
            Data::Bool(b) => *b,
            Data::Number(n) => *n != 0.0 && !n.is_nan(),
            Data::String(s) => !s.is_empty(),
            Data::Object(_) | Data::Array(_) => true,
        }
    }

    /// Text rendering. `null` renders empty, containers render as JSON.
    pub fn to_display(&self) -> String {
        match self {
            Data::Null => String::new(),
            Data::Bool(b) => b.to_string(),
            Data::Number(n) => format_number(*n),
            Data::String(s) => s.to_string(),
            Data::Object(_) | Data::Array(_) => self.to_value().to_json(),
        }
    }

    /// Numeric coercion used by arithmetic operators.
    pub fn to_number(&self) -> f64 {
        match self {
            Data::Null => 0.0,
            Data::Bool(b) => f64::from(u8::from(*b)),
            Data::Number(n) => *n,
            Data::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Data::Object(_) | Data::Array(_) => f64::NAN,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Data::Null => "null",
            Data::Bool(_) => "boolean",
            Data::Number(_) => "number",
            Data::String(_) => "string",
            Data::Object(_) => "object",
            Data::Array(_) => "array",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Data::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Data::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Data::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Data::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Data::Array(array) => Some(array),
            _ => None,
        }
    }

    /// The container's own registry, if this is a container.
    fn container_dep(&self) -> Option<&Rc<Dep>> {
        match self {
            Data::Object(object) => Some(&object.0.dep),
            Data::Array(array) => Some(&array.0.dep),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Data::Object(_) | Data::Array(_) => write!(f, "{}", self.to_display()),
            _ => write!(f, "{:?}", self.to_value()),
        }
    }
}

impl std::fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectRef({})", self.to_value().to_json())
    }
}

impl std::fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ArrayRef({})", self.to_value().to_json())
    }
}

impl From<bool> for Data {
    fn from(value: bool) -> Self {
        Data::Bool(value)
    }
}

impl From<f64> for Data {
    fn from(value: f64) -> Self {
        Data::Number(value)
    }
}

impl From<&str> for Data {
    fn from(value: &str) -> Self {
        Data::string(value)
    }
}

impl From<String> for Data {
    fn from(value: String) -> Self {
        Data::String(Rc::from(value))
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n.fract() == 0.0 && n.abs() < 9.0e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// ----------------------------------------------------------------------------
// Objects
// ----------------------------------------------------------------------------

pub(crate) enum Property {
    /// Observed at creation time (or added through `define`).
    Reactive { value: Data, dep: Rc<Dep> },
    /// Added by a plain write after observation.
    Plain(Data),
    /// Accessor backed by a lazy watcher.
    Computed(Rc<ComputedProperty>),
}

pub(crate) struct ObjectNode {
    runtime: Rc<Runtime>,
    dep: Rc<Dep>,
    props: RefCell<IndexMap<String, Property>>,
}

/// Shared handle to an observed object.
#[derive(Clone)]
pub struct ObjectRef(Rc<ObjectNode>);

/// Non-owning handle to an observed object.
#[derive(Clone)]
pub struct WeakObjectRef(Weak<ObjectNode>);

impl WeakObjectRef {
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }
}

impl ObjectRef {
    /// Create an empty observed object.
    pub fn new(runtime: &Rc<Runtime>) -> Self {
        Self(Rc::new(ObjectNode {
            runtime: runtime.clone(),
            dep: Dep::new(),
            props: RefCell::new(IndexMap::new()),
        }))
    }

    pub(crate) fn from_values(map: IndexMap<String, Value>, runtime: &Rc<Runtime>) -> Self {
        let props = map
            .into_iter()
            .map(|(key, value)| {
                let property = Property::Reactive {
                    value: Data::from_value(value, runtime),
                    dep: Dep::new(),
                };
                (key, property)
            })
            .collect();

        Self(Rc::new(ObjectNode {
            runtime: runtime.clone(),
            dep: Dep::new(),
            props: RefCell::new(props),
        }))
    }

    /// Build an object from already observed entries. Every entry is reactive.
    pub fn from_entries(entries: IndexMap<String, Data>, runtime: &Rc<Runtime>) -> Self {
        let props = entries
            .into_iter()
            .map(|(key, value)| (key, Property::Reactive { value, dep: Dep::new() }))
            .collect();

        Self(Rc::new(ObjectNode {
            runtime: runtime.clone(),
            dep: Dep::new(),
            props: RefCell::new(props),
        }))
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the shared node, stable for its lifetime.
    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Rc::downgrade(&self.0))
    }

    pub fn runtime(&self) -> &Rc<Runtime> {
        &self.0.runtime
    }

    /// The object's own registry, notified when keys are added or removed.
    pub fn dep(&self) -> &Rc<Dep> {
        &self.0.dep
    }

    /// Read a property, registering the current watcher as a dependent.
    ///
    /// A missing key reads as `Null` and subscribes to the object itself so
    /// a later [`define`](Self::define) reaches the reader.
    pub fn get(&self, key: &str) -> Data {
        let (value, dep, computed) = {
            let props = self.0.props.borrow();
            match props.get(key) {
                Some(Property::Reactive { value, dep }) => (value.clone(), Some(dep.clone()), None),
                Some(Property::Plain(value)) => {
                    // Plain keys can still become reactive through `define`.
                    self.0.runtime.track(&self.0.dep);
                    return value.clone();
                }
                Some(Property::Computed(computed)) => (Data::Null, None, Some(computed.clone())),
                None => {
                    self.0.runtime.track(&self.0.dep);
                    return Data::Null;
                }
            }
        };

        if let Some(computed) = computed {
            return computed.get();
        }

        if let Some(dep) = dep {
            self.0.runtime.track(&dep);
            if let Some(child) = value.container_dep() {
                self.0.runtime.track(child);
            }
        }
        value
    }

    /// Read a data property without tracking. Computed properties read as `Null`.
    pub fn get_untracked(&self, key: &str) -> Data {
        match self.0.props.borrow().get(key) {
            Some(Property::Reactive { value, .. }) | Some(Property::Plain(value)) => value.clone(),
            _ => Data::Null,
        }
    }

    /// Write a property. Notifies dependents only when the value changed by
    /// strict identity.
    pub fn set(&self, key: &str, value: Data) -> Result<(), ModelError> {
        enum Outcome {
            Notify(Rc<Dep>),
            Computed(Rc<ComputedProperty>, Data),
            Quiet,
        }

        let outcome = {
            let mut props = self.0.props.borrow_mut();
            match props.get_mut(key) {
                Some(Property::Reactive { value: current, dep }) => {
                    if current.same(&value) {
                        Outcome::Quiet
                    } else {
                        *current = value;
                        Outcome::Notify(dep.clone())
                    }
                }
                Some(Property::Plain(current)) => {
                    *current = value;
                    Outcome::Quiet
                }
                Some(Property::Computed(computed)) => Outcome::Computed(computed.clone(), value),
                None => {
                    tracing::debug!(key, "write to unobserved key stored as plain property");
                    props.insert(key.to_string(), Property::Plain(value));
                    Outcome::Quiet
                }
            }
        };

        match outcome {
            Outcome::Notify(dep) => {
                tracing::trace!(key, "property changed");
                dep.notify();
                Ok(())
            }
            Outcome::Computed(computed, value) => computed.set(value),
            Outcome::Quiet => Ok(()),
        }
    }

    /// Observe `value` and write it.
    pub fn set_value(&self, key: &str, value: impl Into<Value>) -> Result<(), ModelError> {
        let data = Data::from_value(value.into(), &self.0.runtime);
        self.set(key, data)
    }

    /// Add (or replace) a reactive property and notify the object's own
    /// dependents.
    ///
    /// Redefining a reactive key keeps its registry, so readers of the old
    /// value are notified as well.
    pub fn define(&self, key: &str, value: Data) {
        let previous = {
            let mut props = self.0.props.borrow_mut();
            let dep = match props.get(key) {
                Some(Property::Reactive { dep, .. }) => Some(dep.clone()),
                _ => None,
            };
            props.insert(
                key.to_string(),
                Property::Reactive {
                    value,
                    dep: dep.clone().unwrap_or_else(Dep::new),
                },
            );
            dep
        };
        if let Some(dep) = previous {
            dep.notify();
        }
        self.0.dep.notify();
    }

    /// Remove a property and notify the object's own dependents.
    pub fn remove(&self, key: &str) -> Option<Data> {
        let removed = self.0.props.borrow_mut().shift_remove(key)?;
        self.0.dep.notify();
        match removed {
            Property::Reactive { value, .. } | Property::Plain(value) => Some(value),
            Property::Computed(_) => None,
        }
    }

    pub(crate) fn install_computed(&self, key: &str, computed: Rc<ComputedProperty>) {
        self.0
            .props
            .borrow_mut()
            .insert(key.to_string(), Property::Computed(computed));
    }

    /// Enumerate keys, tracking the object itself.
    pub fn keys(&self) -> Vec<String> {
        self.0.runtime.track(&self.0.dep);
        self.0.props.borrow().keys().cloned().collect()
    }

    /// Enumerate entries, tracking the object and every property read.
    pub fn entries(&self) -> Vec<(String, Data)> {
        self.keys()
            .into_iter()
            .map(|key| {
                let value = self.get(&key);
                (key, value)
            })
            .collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.props.borrow().contains_key(key)
    }

    /// Whether `key` is a tracked data property.
    pub fn is_reactive(&self, key: &str) -> bool {
        matches!(
            self.0.props.borrow().get(key),
            Some(Property::Reactive { .. })
        )
    }

    pub fn len(&self) -> usize {
        self.0.props.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.props.borrow().is_empty()
    }

    /// Registry of a data property, for diagnostics and tests.
    pub fn property_dep(&self, key: &str) -> Option<Rc<Dep>> {
        match self.0.props.borrow().get(key) {
            Some(Property::Reactive { dep, .. }) => Some(dep.clone()),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        let props = self.0.props.borrow();
        let map = props
            .iter()
            .filter_map(|(key, property)| match property {
                Property::Reactive { value, .. } | Property::Plain(value) => {
                    Some((key.clone(), value.to_value()))
                }
                Property::Computed(_) => None,
            })
            .collect();
        Value::Object(map)
    }
}

// ----------------------------------------------------------------------------
// Arrays
// ----------------------------------------------------------------------------

pub(crate) struct ArrayNode {
    runtime: Rc<Runtime>,
    dep: Rc<Dep>,
    items: RefCell<Vec<Data>>,
}

/// Shared handle to an observed array.
///
/// The seven mutators (`push`, `pop`, `unshift`, `shift`, `splice`,
/// `reverse`, `sort`) each notify the array's registry exactly once.
#[derive(Clone)]
pub struct ArrayRef(Rc<ArrayNode>);

impl ArrayRef {
    /// Create an empty observed array.
    pub fn new(runtime: &Rc<Runtime>) -> Self {
        Self::from_data(Vec::new(), runtime)
    }

    pub(crate) fn from_values(items: Vec<Value>, runtime: &Rc<Runtime>) -> Self {
        let items = items
            .into_iter()
            .map(|value| Data::from_value(value, runtime))
            .collect();
        Self::from_data(items, runtime)
    }

    /// Build an array from already observed items.
    pub fn from_data(items: Vec<Data>, runtime: &Rc<Runtime>) -> Self {
        Self(Rc::new(ArrayNode {
            runtime: runtime.clone(),
            dep: Dep::new(),
            items: RefCell::new(items),
        }))
    }

    pub fn ptr_eq(&self, other: &ArrayRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn runtime(&self) -> &Rc<Runtime> {
        &self.0.runtime
    }

    /// The array's own registry, notified by every mutator.
    pub fn dep(&self) -> &Rc<Dep> {
        &self.0.dep
    }

    fn track(&self) {
        self.0.runtime.track(&self.0.dep);
    }

    fn observe(&self, value: Value) -> Data {
        Data::from_value(value, &self.0.runtime)
    }

    fn mutate<R>(&self, op: &'static str, f: impl FnOnce(&mut Vec<Data>) -> R) -> R {
        let result = {
            let mut items = self.0.items.borrow_mut();
            f(&mut *items)
        };
        tracing::trace!(op, "array mutated");
        self.0.dep.notify();
        result
    }

    /// Length, tracked.
    pub fn len(&self) -> usize {
        self.track();
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read an element, tracked. Out of range reads as `Null`.
    pub fn get(&self, index: usize) -> Data {
        self.track();
        let item = self.0.items.borrow().get(index).cloned().unwrap_or_default();
        if let Some(child) = item.container_dep() {
            self.0.runtime.track(child);
        }
        item
    }

    /// Copy out all elements, tracked.
    pub fn items(&self) -> Vec<Data> {
        self.track();
        self.0.items.borrow().clone()
    }

    /// Copy out all elements without tracking.
    pub fn items_untracked(&self) -> Vec<Data> {
        self.0.items.borrow().clone()
    }

    /// Replace an element. In-range writes notify when the value changed.
    /// A write at `len` appends silently; anything further out is rejected.
    pub fn set(&self, index: usize, value: Data) -> Result<(), ModelError> {
        let notify = {
            let mut items = self.0.items.borrow_mut();
            let len = items.len();
            if index < len {
                if items[index].same(&value) {
                    false
                } else {
                    items[index] = value;
                    true
                }
            } else if index == len {
                tracing::debug!(index, "write at array end is not observed");
                items.push(value);
                false
            } else {
                tracing::warn!(index, len, "array write past the end rejected");
                return Err(ModelError::IndexOutOfRange { index, len });
            }
        };

        if notify {
            self.0.dep.notify();
        }
        Ok(())
    }

    /// Append a value; returns the new length.
    pub fn push(&self, value: impl Into<Value>) -> usize {
        let data = self.observe(value.into());
        self.push_data(data)
    }

    /// Append an already observed value; returns the new length.
    pub fn push_data(&self, data: Data) -> usize {
        self.mutate("push", |items| {
            items.push(data);
            items.len()
        })
    }

    /// Remove the last element.
    pub fn pop(&self) -> Option<Data> {
        self.mutate("pop", Vec::pop)
    }

    /// Insert a value at the front; returns the new length.
    pub fn unshift(&self, value: impl Into<Value>) -> usize {
        let data = self.observe(value.into());
        self.mutate("unshift", |items| {
            items.insert(0, data);
            items.len()
        })
    }

    /// Remove the first element.
    pub fn shift(&self) -> Option<Data> {
        self.mutate("shift", |items| {
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        })
    }

    /// Remove `delete_count` elements at `start` and insert `insert` there.
    /// Returns the removed elements. `start` is clamped to the length.
    pub fn splice(&self, start: usize, delete_count: usize, insert: Vec<Value>) -> Vec<Data> {
        let inserted: Vec<Data> = insert.into_iter().map(|value| self.observe(value)).collect();
        self.mutate("splice", |items| {
            let start = start.min(items.len());
            let end = start.saturating_add(delete_count).min(items.len());
            items.splice(start..end, inserted).collect()
        })
    }

    /// Reverse in place.
    pub fn reverse(&self) {
        self.mutate("reverse", |items| items.reverse());
    }

    /// Sort in place. All-numeric arrays sort numerically, anything else by
    /// display string.
    pub fn sort(&self) {
        self.mutate("sort", |items| {
            if items.iter().all(|item| matches!(item, Data::Number(_))) {
                items.sort_by(|a, b| {
                    a.to_number()
                        .partial_cmp(&b.to_number())
                        .unwrap_or(Ordering::Equal)
                });
            } else {
                items.sort_by_key(Data::to_display);
            }
        });
    }

    /// Sort in place with a comparator.
    pub fn sort_by(&self, compare: impl FnMut(&Data, &Data) -> Ordering) {
        // The comparator may read this array, so sort a detached copy.
        let mut sorted = self.items_untracked();
        sorted.sort_by(compare);
        self.mutate("sort", |items| *items = sorted);
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.0.items.borrow().iter().map(Data::to_value).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Watcher;
    use serde_json::json;
    use std::cell::Cell;

    fn observe(json: serde_json::Value) -> (Rc<Runtime>, Data) {
        let runtime = Runtime::new();
        let data = Data::from_value(Value::from(json), &runtime);
        (runtime, data)
    }

    fn watch(runtime: &Rc<Runtime>, hits: &Rc<Cell<u32>>, read: impl Fn() -> Data + 'static) -> Rc<Watcher> {
        let hits = hits.clone();
        Watcher::new(runtime, "test", move || Ok(read()), move |_, _| hits.set(hits.get() + 1))
    }

    #[test]
    fn round_trips_values() {
        let (_runtime, data) = observe(json!({"a": 1, "b": [1, "x", {"c": null}]}));
        assert_eq!(data.to_value(), Value::from(json!({"a": 1, "b": [1, "x", {"c": null}]})));
    }

    #[test]
    fn write_notifies_once_and_ignores_identical_writes() {
        let (runtime, data) = observe(json!({"name": "World"}));
        let object = data.as_object().unwrap().clone();
        let hits = Rc::new(Cell::new(0));
        let reader = object.clone();
        let _watcher = watch(&runtime, &hits, move || reader.get("name"));

        object.set("name", Data::from("Vue")).unwrap();
        assert_eq!(hits.get(), 1);

        object.set("name", Data::from("Vue")).unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(object.get("name").as_str(), Some("Vue"));
    }

    #[test]
    fn same_reference_write_is_quiet() {
        let (runtime, data) = observe(json!({"inner": {"x": 1}}));
        let object = data.as_object().unwrap().clone();
        let dep = object.property_dep("inner").unwrap();
        let inner = object.get_untracked("inner");
        let hits = Rc::new(Cell::new(0));
        let reader = object.clone();
        let _watcher = watch(&runtime, &hits, move || Data::from(reader.get("inner").truthy()));

        assert_eq!(dep.subscriber_count(), 1);
        object.set("inner", inner).unwrap();
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn every_mutator_notifies_exactly_once() {
        let (runtime, data) = observe(json!({"items": [3, 1, 2]}));
        let object = data.as_object().unwrap().clone();
        let array = object.get_untracked("items").as_array().unwrap().clone();
        let dep = array.dep().clone();

        let notified = Rc::new(Cell::new(0));
        let counter = notified.clone();
        let reader = object.clone();
        let _watcher = Watcher::new(
            &runtime,
            "items",
            move || {
                // Changes on every run so the callback count equals the
                // notification count.
                counter.set(counter.get() + 1);
                let _ = reader.get("items");
                Ok(Data::Number(f64::from(counter.get())))
            },
            |_, _| {},
        );
        assert_eq!(dep.subscriber_count(), 1);
        let baseline = notified.get();

        array.push(4);
        array.pop();
        array.unshift(0);
        array.shift();
        array.splice(1, 1, vec![Value::from(9), Value::from(8)]);
        array.reverse();
        array.sort();

        assert_eq!(notified.get() - baseline, 7);
        assert_eq!(array.to_value(), Value::from(json!([2, 3, 8, 9])));
    }

    #[test]
    fn appended_objects_are_observable() {
        let (runtime, data) = observe(json!({"items": []}));
        let object = data.as_object().unwrap().clone();
        let array = object.get_untracked("items").as_array().unwrap().clone();

        array.push(Value::from(json!({"label": "a"})));
        let appended = array.items_untracked()[0].as_object().unwrap().clone();

        let hits = Rc::new(Cell::new(0));
        let reader = appended.clone();
        let _watcher = watch(&runtime, &hits, move || reader.get("label"));

        appended.set_value("label", "b").unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn redefine_reaches_existing_readers() {
        let (runtime, data) = observe(json!({"name": "a"}));
        let object = data.as_object().unwrap().clone();
        let dep = object.property_dep("name").unwrap();
        let seen = Rc::new(Cell::new(0));
        let reader = object.clone();
        let _watcher = watch(&runtime, &seen, move || reader.get("name"));

        object.define("name", Data::from("b"));
        assert_eq!(seen.get(), 1);
        assert!(Rc::ptr_eq(&dep, &object.property_dep("name").unwrap()));

        object.set("name", Data::from("c")).unwrap();
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn plain_reads_still_see_a_later_define() {
        let (runtime, data) = observe(json!({"other": "x"}));
        let object = data.as_object().unwrap().clone();
        let seen = Rc::new(Cell::new(0));
        let reader = object.clone();
        let _watcher = watch(&runtime, &seen, move || {
            Data::string(format!("{}-{}", reader.get("late").to_display(), reader.get("other").to_display()))
        });

        object.set_value("late", 1).unwrap();
        // Re-evaluates with `late` stored as a plain property.
        object.set_value("other", "y").unwrap();
        assert_eq!(seen.get(), 1);

        object.define("late", Data::Number(2.0));
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn new_keys_are_not_reactive_until_defined() {
        let (runtime, data) = observe(json!({}));
        let object = data.as_object().unwrap().clone();
        let hits = Rc::new(Cell::new(0));
        let reader = object.clone();
        let _watcher = watch(&runtime, &hits, move || reader.get("late"));

        object.set_value("late", 1).unwrap();
        assert!(!object.is_reactive("late"));
        assert_eq!(object.get_untracked("late").as_number(), Some(1.0));

        object.define("later", Data::Number(2.0));
        assert!(object.is_reactive("later"));
    }

    #[test]
    fn write_at_end_is_silent() {
        let (runtime, data) = observe(json!([1]));
        let array = data.as_array().unwrap().clone();
        let hits = Rc::new(Cell::new(0));
        let reader = array.clone();
        let _watcher = watch(&runtime, &hits, move || Data::Number(reader.len() as f64));

        array.set(1, Data::Number(4.0)).unwrap();
        assert_eq!(hits.get(), 0);
        assert_eq!(array.to_value(), Value::from(json!([1, 4])));

        // In-range writes notify; the watcher now sees the extended length.
        array.set(0, Data::Number(7.0)).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn write_beyond_end_is_rejected() {
        let (_runtime, data) = observe(json!([1]));
        let array = data.as_array().unwrap().clone();

        assert_eq!(
            array.set(3, Data::Number(4.0)).unwrap_err(),
            ModelError::IndexOutOfRange { index: 3, len: 1 }
        );
        assert_eq!(
            array.set(usize::MAX, Data::Null).unwrap_err(),
            ModelError::IndexOutOfRange { index: usize::MAX, len: 1 }
        );
        assert_eq!(array.to_value(), Value::from(json!([1])));
    }

    #[test]
    fn comparator_may_read_the_array() {
        let (runtime, data) = observe(json!(["bb", "a", "ccc"]));
        let array = data.as_array().unwrap().clone();
        let hits = Rc::new(Cell::new(0));
        let reader = array.clone();
        let _watcher = watch(&runtime, &hits, move || reader.get(0));

        let peer = array.clone();
        array.sort_by(|a, b| {
            assert_eq!(peer.len(), 3);
            a.to_display().len().cmp(&b.to_display().len())
        });
        assert_eq!(array.to_value(), Value::from(json!(["a", "bb", "ccc"])));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn display_and_truthiness() {
        assert_eq!(Data::Number(3.0).to_display(), "3");
        assert_eq!(Data::Number(1.5).to_display(), "1.5");
        assert_eq!(Data::Null.to_display(), "");
        assert!(!Data::string("").truthy());
        assert!(!Data::Number(0.0).truthy());
        let (_runtime, data) = observe(json!({"a": [1, 2]}));
        assert_eq!(data.to_display(), r#"{"a":[1,2]}"#);
        assert!(data.truthy());
    }
}
