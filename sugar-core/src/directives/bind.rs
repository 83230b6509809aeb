//! `bind`: attribute, style and class bindings.
//!
//! `bind:name="expr"` binds one attribute. Without an argument the
//! expression must produce an object whose keys are attribute names; an
//! object literal gets one watcher per key so a change re-applies only
//! the attribute it affects.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use super::{watch_shallow_contents, Directive, DirectiveContext, DirectiveKind};
use crate::dom::{self, Node};
use crate::error::CompileError;
use crate::expression::Expression;
use crate::observer::Data;
use crate::reactive::Watcher;

struct BindDirective {
    node: Node,
    watchers: SmallVec<[Rc<Watcher>; 2]>,
}

pub(super) fn create(context: &DirectiveContext<'_>) -> Result<Box<dyn Directive>, CompileError> {
    let expression = context.descriptor.parse_expression()?;
    let node = context.node.clone();
    let mut watchers = SmallVec::new();

    if let Some(name) = context.descriptor.argument.as_deref().filter(|name| !name.is_empty()) {
        watchers.push(bind_one(context, name, &expression));
    } else if let Some(entries) = expression.object_entries() {
        for (name, value) in entries {
            watchers.push(bind_one(context, &name, &value));
        }
    } else {
        let binding = Rc::new(ObjectBinding {
            node: node.clone(),
            bindings: RefCell::new(IndexMap::new()),
        });
        let updater = binding.clone();
        let watcher = watch_shallow_contents(context.scope, &expression, move |value, _| updater.apply(value));
        binding.apply(&watcher.value());
        watchers.push(watcher);
    }

    Ok(Box::new(BindDirective { node, watchers }))
}

fn bind_one(context: &DirectiveContext<'_>, name: &str, expression: &Expression) -> Rc<Watcher> {
    let binding = Rc::new(AttributeBinding::new(context.node, name));
    let updater = binding.clone();
    let watcher = watch_shallow_contents(context.scope, expression, move |value, _| updater.apply(value));
    binding.apply(&watcher.value());
    watcher
}

/// One attribute of one node.
struct AttributeBinding {
    node: Node,
    name: String,
    /// Style properties or classes set by the last update, so the next one
    /// can take back what it no longer wants.
    written: RefCell<IndexSet<String>>,
}

impl AttributeBinding {
    fn new(node: &Node, name: &str) -> Self {
        Self {
            node: node.clone(),
            name: name.to_string(),
            written: RefCell::new(IndexSet::new()),
        }
    }

    fn apply(&self, value: &Data) {
        match self.name.as_str() {
            "style" => {
                let declarations = style_declarations(value);
                for name in self.written.borrow().iter() {
                    if !declarations.contains_key(name) {
                        self.node.remove_style_property(name);
                    }
                }
                for (name, value) in &declarations {
                    self.node.set_style_property(name, value);
                }
                *self.written.borrow_mut() = declarations.into_keys().collect();
            }
            "class" => {
                let classes = class_names(value);
                for name in self.written.borrow().iter() {
                    if !classes.contains(name) {
                        self.node.remove_class(name);
                    }
                }
                for name in &classes {
                    self.node.add_class(name);
                }
                *self.written.borrow_mut() = classes;
            }
            name => match value {
                Data::Null | Data::Bool(false) => {
                    self.node.remove_attribute(name);
                }
                Data::Bool(true) => self.node.set_attribute(name, ""),
                other => self.node.set_attribute(name, &other.to_display()),
            },
        }
    }
}

/// `bind="expr"` where `expr` is not an object literal.
struct ObjectBinding {
    node: Node,
    bindings: RefCell<IndexMap<String, AttributeBinding>>,
}

impl ObjectBinding {
    fn apply(&self, value: &Data) {
        let entries: IndexMap<String, Data> = match value {
            Data::Object(object) => object.entries().into_iter().collect(),
            Data::Null => IndexMap::new(),
            other => {
                tracing::warn!(found = other.type_name(), "bind without an argument needs an object");
                IndexMap::new()
            }
        };

        let mut bindings = self.bindings.borrow_mut();
        bindings.retain(|name, binding| {
            let keep = entries.contains_key(name);
            if !keep {
                binding.apply(&Data::Null);
            }
            keep
        });
        for (name, value) in &entries {
            bindings
                .entry(name.clone())
                .or_insert_with(|| AttributeBinding::new(&self.node, name))
                .apply(value);
        }
    }
}

/// `paddingTop` -> `padding-top`.
fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn style_declarations(value: &Data) -> IndexMap<String, String> {
    match value {
        Data::Object(object) => object
            .entries()
            .into_iter()
            .filter(|(_, value)| !matches!(value, Data::Null | Data::Bool(false)))
            .map(|(name, value)| (kebab_case(&name), value.to_display()))
            .collect(),
        Data::String(text) => dom::parse_style(text),
        _ => IndexMap::new(),
    }
}

fn class_names(value: &Data) -> IndexSet<String> {
    match value {
        Data::String(text) => text.split_whitespace().map(str::to_string).collect(),
        Data::Object(object) => object
            .entries()
            .into_iter()
            .filter(|(_, on)| on.truthy())
            .map(|(name, _)| name)
            .collect(),
        Data::Array(array) => array
            .items_untracked()
            .iter()
            .filter(|item| !item.is_null())
            .map(Data::to_display)
            .collect(),
        _ => IndexSet::new(),
    }
}

impl Directive for BindDirective {
    fn kind(&self) -> DirectiveKind {
        DirectiveKind::Bind
    }

    fn node(&self) -> &Node {
        &self.node
    }

    fn destroy(&self) {
        for watcher in &self.watchers {
            watcher.teardown();
        }
    }
}
