//! Observer
//!
//! Converts a plain [`Value`] tree into an observed [`Data`] tree whose
//! property reads register the evaluating watcher and whose writes notify
//! dependents.
//!
//! The whole tree is instrumented up front, so array mutators inside nested
//! values are intercepted no matter when those values are first read.

mod data;
mod model;
mod value;

use std::rc::Rc;

pub use data::{ArrayRef, Data, ObjectRef, WeakObjectRef};
pub use model::Model;
pub use value::Value;

use crate::error::CompileError;
use crate::reactive::Runtime;

/// Instruments values against one runtime.
#[derive(Debug, Clone)]
pub struct Observer {
    runtime: Rc<Runtime>,
}

impl Observer {
    pub fn new(runtime: &Rc<Runtime>) -> Self {
        Self {
            runtime: runtime.clone(),
        }
    }

    pub fn runtime(&self) -> &Rc<Runtime> {
        &self.runtime
    }

    /// Observe a plain value. Scalars pass through unchanged.
    pub fn observe(&self, value: Value) -> Data {
        Data::from_value(value, &self.runtime)
    }

    /// Observing data that is already observed returns it as is.
    pub fn observe_data(&self, data: Data) -> Data {
        data
    }

    /// Observe the root model, which must be an object.
    pub fn observe_model(&self, value: Value) -> Result<Model, CompileError> {
        match self.observe(value) {
            Data::Object(root) => Ok(Model::new(root)),
            other => Err(CompileError::InvalidModel(other.type_name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn model_must_be_an_object() {
        let observer = Observer::new(&Runtime::new());
        let err = observer.observe_model(Value::from(json!([1]))).unwrap_err();
        assert_eq!(err, CompileError::InvalidModel("array"));
    }

    #[test]
    fn reobserving_is_identity() {
        let observer = Observer::new(&Runtime::new());
        let data = observer.observe(Value::from(json!({"a": 1})));
        let again = observer.observe_data(data.clone());
        assert!(data.same(&again));
    }
}
