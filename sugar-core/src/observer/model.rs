//! Path access to the root model object.
//!
//! Paths are dot separated (`items.0.label`); numeric segments index
//! arrays and `length` reads an array's length.

use std::rc::Rc;

use smallvec::SmallVec;

use super::data::{ArrayRef, Data, ObjectRef};
use super::value::Value;
use crate::error::ModelError;
use crate::reactive::{ComputedGetter, ComputedProperty, ComputedSetter, Runtime};

type Segments<'a> = SmallVec<[&'a str; 4]>;

fn segments(path: &str) -> Segments<'_> {
    path.split('.').filter(|segment| !segment.is_empty()).collect()
}

/// The observed root of a compiler's data.
#[derive(Clone)]
pub struct Model {
    root: ObjectRef,
}

impl Model {
    pub(crate) fn new(root: ObjectRef) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &ObjectRef {
        &self.root
    }

    pub fn runtime(&self) -> &Rc<Runtime> {
        self.root.runtime()
    }

    fn step(current: &Data, segment: &str, path: &str) -> Result<Data, ModelError> {
        match current {
            Data::Object(object) => Ok(object.get(segment)),
            Data::Array(array) if segment == "length" => Ok(Data::Number(array.len() as f64)),
            Data::Array(array) => segment
                .parse::<usize>()
                .map(|index| array.get(index))
                .map_err(|_| ModelError::PathNotFound(path.to_string())),
            _ => Err(ModelError::PathNotFound(path.to_string())),
        }
    }

    /// Read the value at `path`, tracked. A missing leaf reads as `Null`.
    pub fn get(&self, path: &str) -> Result<Data, ModelError> {
        let mut current = Data::Object(self.root.clone());
        for segment in segments(path) {
            current = Self::step(&current, segment, path)?;
        }
        Ok(current)
    }

    fn parent<'a>(&self, path: &'a str) -> Result<(Data, &'a str), ModelError> {
        let segments = segments(path);
        let Some((last, init)) = segments.split_last() else {
            return Err(ModelError::PathNotFound(path.to_string()));
        };

        let mut current = Data::Object(self.root.clone());
        for segment in init {
            current = Self::step(&current, segment, path)?;
        }
        Ok((current, *last))
    }

    /// Observe `value` and write it at `path`.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<(), ModelError> {
        let data = Data::from_value(value.into(), self.runtime());
        self.set_data(path, data)
    }

    /// Write an already observed value at `path`.
    pub fn set_data(&self, path: &str, data: Data) -> Result<(), ModelError> {
        let (parent, key) = self.parent(path)?;
        match parent {
            Data::Object(object) => object.set(key, data),
            Data::Array(array) => {
                let index = key
                    .parse::<usize>()
                    .map_err(|_| ModelError::PathNotFound(path.to_string()))?;
                array.set(index, data)
            }
            _ => Err(ModelError::PathNotFound(path.to_string())),
        }
    }

    /// Add a reactive property at `path` after observation.
    pub fn define(&self, path: &str, value: impl Into<Value>) -> Result<(), ModelError> {
        let (parent, key) = self.parent(path)?;
        let object = parent
            .as_object()
            .ok_or_else(|| ModelError::PathNotFound(path.to_string()))?;
        object.define(key, Data::from_value(value.into(), self.runtime()));
        Ok(())
    }

    /// The array at `path`.
    pub fn array(&self, path: &str) -> Result<ArrayRef, ModelError> {
        match self.get(path)? {
            Data::Array(array) => Ok(array),
            _ => Err(ModelError::NotAnArray(path.to_string())),
        }
    }

    /// The object at `path`.
    pub fn object(&self, path: &str) -> Result<ObjectRef, ModelError> {
        match self.get(path)? {
            Data::Object(object) => Ok(object),
            _ => Err(ModelError::PathNotFound(path.to_string())),
        }
    }

    /// Install a computed property on the root object.
    pub fn define_computed(&self, name: &str, getter: ComputedGetter, setter: Option<ComputedSetter>) {
        let computed = ComputedProperty::new(name, self, getter, setter);
        self.root.install_computed(name, computed);
    }

    /// Untracked snapshot of the data properties.
    pub fn to_value(&self) -> Value {
        self.root.to_value()
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Model").field(&self.to_value()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::Observer;
    use serde_json::json;

    fn model(json: serde_json::Value) -> Model {
        Observer::new(&Runtime::new())
            .observe_model(Value::from(json))
            .unwrap()
    }

    #[test]
    fn reads_nested_paths() {
        let model = model(json!({"user": {"tags": ["a", "b"]}}));
        assert_eq!(model.get("user.tags.1").unwrap().as_str(), Some("b"));
        assert_eq!(model.get("user.tags.length").unwrap().as_number(), Some(2.0));
        assert!(model.get("user.missing").unwrap().is_null());
        assert_eq!(
            model.get("user.missing.deeper").unwrap_err(),
            ModelError::PathNotFound("user.missing.deeper".into())
        );
    }

    #[test]
    fn writes_nested_paths() {
        let model = model(json!({"user": {"name": "a"}, "list": [1, 2]}));
        model.set("user.name", "b").unwrap();
        model.set("list.0", 10).unwrap();
        assert_eq!(model.to_value(), Value::from(json!({"user": {"name": "b"}, "list": [10, 2]})));
    }

    #[test]
    fn array_lookup_checks_type() {
        let model = model(json!({"list": [], "scalar": 1}));
        assert!(model.array("list").is_ok());
        assert_eq!(model.array("scalar").unwrap_err(), ModelError::NotAnArray("scalar".into()));
    }

    #[test]
    fn huge_index_is_an_error() {
        let model = model(json!({"list": [1, 2]}));
        assert_eq!(
            model.set("list.18446744073709551615", 1).unwrap_err(),
            ModelError::IndexOutOfRange { index: usize::MAX, len: 2 }
        );
        model.set("list.2", 3).unwrap();
        assert_eq!(model.to_value(), Value::from(json!({"list": [1, 2, 3]})));
    }

    #[test]
    fn define_adds_reactive_property() {
        let model = model(json!({"user": {}}));
        model.define("user.age", 3).unwrap();
        assert!(model.object("user").unwrap().is_reactive("age"));
    }
}
