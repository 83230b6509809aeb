//! Compiler configuration.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::directives::CustomUpdate;
use crate::dom::Node;
use crate::expression::{Method, Methods};
use crate::observer::{Data, Model, Value};
use crate::reactive::{ComputedGetter, ComputedSetter};

/// Default directive attribute prefix.
pub const DEFAULT_PREFIX: &str = "v-";

/// A computed property definition.
#[derive(Clone)]
pub struct ComputedDef {
    pub getter: ComputedGetter,
    pub setter: Option<ComputedSetter>,
}

/// Everything needed to build a [`Compiler`](super::Compiler).
///
/// ```rust,ignore
/// let options = CompilerOptions::new(view, json!({"first": "Ada", "last": "Lovelace"}))
///     .computed("full", |m| format!("{} {}", m.get("first")?, m.get("last")?).into())
///     .method("greet", |m, _| { m.set("first", "Grace").ok(); Value::Null });
/// ```
#[derive(Clone)]
pub struct CompilerOptions {
    pub(crate) view: Node,
    pub(crate) model: Value,
    pub(crate) computed: IndexMap<String, ComputedDef>,
    pub(crate) customs: IndexMap<String, CustomUpdate>,
    pub(crate) methods: Methods,
    pub(crate) prefix: String,
}

impl CompilerOptions {
    pub fn new(view: Node, model: impl Into<Value>) -> Self {
        Self {
            view,
            model: model.into(),
            computed: IndexMap::new(),
            customs: IndexMap::new(),
            methods: Methods::new(),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    /// Add a read-only computed property.
    pub fn computed(mut self, name: &str, getter: impl Fn(&Model) -> Value + 'static) -> Self {
        self.computed.insert(
            name.to_string(),
            ComputedDef {
                getter: Rc::new(getter),
                setter: None,
            },
        );
        self
    }

    /// Add a computed property with a setter.
    pub fn computed_with_setter(
        mut self,
        name: &str,
        getter: impl Fn(&Model) -> Value + 'static,
        setter: impl Fn(&Model, Value) + 'static,
    ) -> Self {
        self.computed.insert(
            name.to_string(),
            ComputedDef {
                getter: Rc::new(getter),
                setter: Some(Rc::new(setter)),
            },
        );
        self
    }

    /// Add an update function for `v-custom:<name>`.
    pub fn custom(mut self, name: &str, update: impl Fn(&Data, &Data, &Node) + 'static) -> Self {
        self.customs.insert(name.to_string(), Rc::new(update));
        self
    }

    /// Add a method callable from expressions and `v-on`.
    pub fn method(mut self, name: &str, method: impl Fn(&Model, &[Data]) -> Value + 'static) -> Self {
        let method: Method = Rc::new(method);
        self.methods.insert(name.to_string(), method);
        self
    }

    /// Use a different directive prefix, e.g. `"s-"`.
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }
}

impl std::fmt::Debug for CompilerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilerOptions")
            .field("view", &self.view)
            .field("model", &self.model)
            .field("computed", &self.computed.keys().collect::<Vec<_>>())
            .field("customs", &self.customs.keys().collect::<Vec<_>>())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("prefix", &self.prefix)
            .finish()
    }
}
