//! Name resolution for expressions.
//!
//! The root scope resolves names against the model. A loop iteration gets a
//! child scope holding its locals (the alias, `$index`, `$key`) in a small
//! observed object, so rebinding `$index` after a reorder updates every
//! binding that read it. Misses fall through to the parent; a child never
//! writes into its parent's locals.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::ExprError;
use crate::observer::{ArrayRef, Data, Model, ObjectRef, Value};

/// A method callable from expressions and `v-on` handlers.
pub type Method = Rc<dyn Fn(&Model, &[Data]) -> Value>;

/// Registered methods, by name.
pub type Methods = IndexMap<String, Method>;

/// Where a loop alias came from, so writes to the alias reach the source.
#[derive(Clone)]
pub enum LoopSource {
    Array(ArrayRef),
    Object(ObjectRef),
}

#[derive(Clone)]
struct LoopBinding {
    alias: String,
    source: LoopSource,
}

enum Frame {
    Root {
        model: Model,
        methods: Rc<Methods>,
    },
    Child {
        locals: ObjectRef,
        binding: Option<LoopBinding>,
        parent: Scope,
    },
}

/// A shared, immutable link in the scope chain.
#[derive(Clone)]
pub struct Scope(Rc<Frame>);

impl Scope {
    pub fn root(model: Model, methods: Rc<Methods>) -> Self {
        Self(Rc::new(Frame::Root { model, methods }))
    }

    /// A child scope with plain locals.
    pub fn child(&self, locals: IndexMap<String, Data>) -> Self {
        let locals = ObjectRef::from_entries(locals, self.model().runtime());
        Self(Rc::new(Frame::Child {
            locals,
            binding: None,
            parent: self.clone(),
        }))
    }

    /// A loop iteration scope. `alias` is bound to `item`; assigning to the
    /// alias writes the element back into `source` at the current `$index`
    /// (or `$key` for objects).
    pub fn iteration(&self, alias: &str, item: Data, extra: IndexMap<String, Data>, source: LoopSource) -> Self {
        let mut entries = IndexMap::with_capacity(extra.len() + 1);
        entries.insert(alias.to_string(), item);
        entries.extend(extra);

        let locals = ObjectRef::from_entries(entries, self.model().runtime());
        Self(Rc::new(Frame::Child {
            locals,
            binding: Some(LoopBinding {
                alias: alias.to_string(),
                source,
            }),
            parent: self.clone(),
        }))
    }

    pub fn is_root(&self) -> bool {
        matches!(&*self.0, Frame::Root { .. })
    }

    pub fn parent(&self) -> Option<&Scope> {
        match &*self.0 {
            Frame::Root { .. } => None,
            Frame::Child { parent, .. } => Some(parent),
        }
    }

    pub fn model(&self) -> &Model {
        match &*self.0 {
            Frame::Root { model, .. } => model,
            Frame::Child { parent, .. } => parent.model(),
        }
    }

    pub fn method(&self, name: &str) -> Option<Method> {
        match &*self.0 {
            Frame::Root { methods, .. } => methods.get(name).cloned(),
            Frame::Child { parent, .. } => parent.method(name),
        }
    }

    /// Resolve a name, tracked.
    pub fn lookup(&self, name: &str) -> Data {
        match &*self.0 {
            Frame::Root { model, .. } => model.root().get(name),
            Frame::Child { locals, parent, .. } => {
                if locals.contains_key(name) {
                    locals.get(name)
                } else {
                    parent.lookup(name)
                }
            }
        }
    }

    /// Whether `name` is bound in this frame itself.
    pub fn has_local(&self, name: &str) -> bool {
        match &*self.0 {
            Frame::Root { .. } => false,
            Frame::Child { locals, .. } => locals.contains_key(name),
        }
    }

    /// Rebind a local of this frame, notifying readers. Used by loops to
    /// refresh `$index` and the alias after reconciliation.
    pub fn set_local(&self, name: &str, value: Data) {
        if let Frame::Child { locals, .. } = &*self.0 {
            if locals.contains_key(name) {
                // Locals are always reactive, so this cannot fail.
                let _ = locals.set(name, value);
            } else {
                locals.define(name, value);
            }
        }
    }

    /// Write a name. Writes to a loop alias update the iterated element.
    pub fn assign(&self, name: &str, value: Data) -> Result<(), ExprError> {
        match &*self.0 {
            Frame::Root { model, .. } => model
                .root()
                .set(name, value)
                .map_err(|err| ExprError::Runtime(err.to_string())),
            Frame::Child {
                locals,
                binding,
                parent,
            } => {
                if !locals.contains_key(name) {
                    return parent.assign(name, value);
                }

                if let Some(binding) = binding.as_ref().filter(|binding| binding.alias == name) {
                    match &binding.source {
                        LoopSource::Array(array) => {
                            let index = locals.get_untracked("$index").to_number();
                            if index.is_finite() && index >= 0.0 {
                                array
                                    .set(index as usize, value.clone())
                                    .map_err(|err| ExprError::Runtime(err.to_string()))?;
                            }
                        }
                        LoopSource::Object(object) => {
                            let key = locals.get_untracked("$key").to_display();
                            object
                                .set(&key, value.clone())
                                .map_err(|err| ExprError::Runtime(err.to_string()))?;
                        }
                    }
                }

                locals
                    .set(name, value)
                    .map_err(|err| ExprError::Runtime(err.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &*self.0 {
            Frame::Root { .. } => f.write_str("Scope::Root"),
            Frame::Child { locals, parent, .. } => f
                .debug_struct("Scope::Child")
                .field("locals", &locals.to_value())
                .field("parent", parent)
                .finish(),
        }
    }
}
