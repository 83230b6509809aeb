//! Directives
//!
//! A directive binds one node to one expression and keeps the node in step
//! with the model. Each directive owns the watchers it creates; dropping or
//! destroying the directive detaches them.
//!
//! Directive kinds form a closed set ([`DirectiveKind`]). The [`Registry`]
//! maps each kind that needs an instance to its factory; `pre`, `cloak` and
//! `else` are markers consumed by the compiler or a sibling directive and
//! never instantiated.

mod bind;
mod condition;
mod custom;
mod el;
mod html;
mod list;
mod model;
mod on;
mod show;
mod text;

use std::rc::Rc;

use indexmap::IndexMap;

pub use custom::CustomUpdate;

use crate::compiler::CompilerCore;
use crate::dom::Node;
use crate::error::CompileError;
use crate::expression::{Expression, Scope};
use crate::observer::Data;
use crate::reactive::Watcher;

/// Every directive the compiler understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Text,
    Html,
    If,
    Else,
    For,
    Bind,
    Model,
    On,
    Show,
    El,
    Custom,
    Pre,
    Cloak,
}

impl DirectiveKind {
    /// Resolve a directive name without its prefix, e.g. `bind`.
    pub fn parse(name: &str) -> Option<Self> {
        let kind = match name {
            "text" => Self::Text,
            "html" => Self::Html,
            "if" => Self::If,
            "else" => Self::Else,
            "for" => Self::For,
            "bind" => Self::Bind,
            "model" => Self::Model,
            "on" => Self::On,
            "show" => Self::Show,
            "el" => Self::El,
            "custom" => Self::Custom,
            "pre" => Self::Pre,
            "cloak" => Self::Cloak,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Html => "html",
            Self::If => "if",
            Self::Else => "else",
            Self::For => "for",
            Self::Bind => "bind",
            Self::Model => "model",
            Self::On => "on",
            Self::Show => "show",
            Self::El => "el",
            Self::Custom => "custom",
            Self::Pre => "pre",
            Self::Cloak => "cloak",
        }
    }

    /// Structural hints that need no instance.
    pub fn is_marker(self) -> bool {
        matches!(self, Self::Pre | Self::Cloak | Self::Else)
    }
}

/// A parsed directive attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// Full attribute name, e.g. `v-bind:id`.
    pub attr: String,
    /// Directive name with its prefix, e.g. `v-bind`.
    pub directive: String,
    pub kind: Option<DirectiveKind>,
    /// Text after the first `:`, if any.
    pub argument: Option<String>,
    pub expression: String,
}

impl Descriptor {
    /// Split `attr` on its first `:` into directive and argument.
    pub fn parse(attr: &str, expression: &str, prefix: &str) -> Self {
        let (directive, argument) = match attr.split_once(':') {
            Some((directive, argument)) => (directive, Some(argument.to_string())),
            None => (attr, None),
        };
        let kind = directive
            .strip_prefix(prefix)
            .and_then(DirectiveKind::parse);

        Self {
            attr: attr.to_string(),
            directive: directive.to_string(),
            kind,
            argument,
            expression: expression.to_string(),
        }
    }

    /// The argument, or an error naming the directive.
    pub(crate) fn require_argument(&self) -> Result<&str, CompileError> {
        self.argument
            .as_deref()
            .filter(|argument| !argument.is_empty())
            .ok_or_else(|| CompileError::MissingArgument(self.attr.clone()))
    }

    /// Parse the expression, attributing failures to it.
    pub(crate) fn parse_expression(&self) -> Result<Expression, CompileError> {
        Expression::parse(&self.expression).map_err(|err| CompileError::expression(&self.expression, err))
    }
}

/// A live binding created by the compiler.
pub trait Directive {
    fn kind(&self) -> DirectiveKind;

    /// The node the directive was compiled on.
    fn node(&self) -> &Node;

    /// Detach every watcher and listener. Idempotent.
    fn destroy(&self);

    /// The node standing in for [`node`](Self::node) while the directive
    /// has taken it out of the document.
    fn placeholder(&self) -> Option<Node> {
        None
    }
}

/// Everything a factory needs to build a directive.
pub struct DirectiveContext<'a> {
    pub core: &'a Rc<CompilerCore>,
    pub node: &'a Node,
    pub descriptor: &'a Descriptor,
    pub scope: &'a Scope,
}

pub type Factory = fn(&DirectiveContext<'_>) -> Result<Box<dyn Directive>, CompileError>;

/// Maps directive kinds to factories.
pub struct Registry {
    factories: IndexMap<DirectiveKind, Factory>,
}

impl Registry {
    /// The built-in directive set.
    pub fn standard() -> Self {
        let mut registry = Self {
            factories: IndexMap::new(),
        };
        registry.register(DirectiveKind::Text, text::create);
        registry.register(DirectiveKind::Html, html::create);
        registry.register(DirectiveKind::If, condition::create);
        registry.register(DirectiveKind::For, list::create);
        registry.register(DirectiveKind::Bind, bind::create);
        registry.register(DirectiveKind::Model, model::create);
        registry.register(DirectiveKind::On, on::create);
        registry.register(DirectiveKind::Show, show::create);
        registry.register(DirectiveKind::El, el::create);
        registry.register(DirectiveKind::Custom, custom::create);
        registry
    }

    pub fn register(&mut self, kind: DirectiveKind, factory: Factory) {
        self.factories.insert(kind, factory);
    }

    pub fn contains(&self, kind: DirectiveKind) -> bool {
        self.factories.contains_key(&kind)
    }

    pub fn create(&self, context: &DirectiveContext<'_>) -> Result<Box<dyn Directive>, CompileError> {
        let factory = context
            .descriptor
            .kind
            .and_then(|kind| self.factories.get(&kind))
            .ok_or_else(|| CompileError::UnknownDirective(context.descriptor.directive.clone()))?;
        factory(context)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

/// Watch `expression` in `scope`, calling `update` with `(new, old)`.
pub(crate) fn watch(
    scope: &Scope,
    expression: &Expression,
    update: impl Fn(&Data, &Data) + 'static,
) -> Rc<Watcher> {
    let getter_scope = scope.clone();
    let getter_expression = expression.clone();
    Watcher::new(
        scope.model().runtime(),
        expression.source(),
        move || getter_expression.evaluate(&getter_scope),
        update,
    )
}

/// Like [`watch`], but also depends on the first level of an object or
/// array result, so `style`/`class` objects react to in-place edits.
pub(crate) fn watch_shallow_contents(
    scope: &Scope,
    expression: &Expression,
    update: impl Fn(&Data, &Data) + 'static,
) -> Rc<Watcher> {
    let getter_scope = scope.clone();
    let getter_expression = expression.clone();
    Watcher::new(
        scope.model().runtime(),
        expression.source(),
        move || {
            let value = getter_expression.evaluate(&getter_scope)?;
            match &value {
                Data::Object(object) => {
                    object.entries();
                }
                Data::Array(array) => {
                    array.items();
                }
                _ => {}
            }
            Ok(value)
        },
        update,
    )
}

/// Tear down every directive in `directives`.
pub(crate) fn destroy_all(directives: Vec<Box<dyn Directive>>) {
    for directive in directives {
        directive.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_splits_on_first_colon() {
        let desc = Descriptor::parse("v-bind:xlink:href", "url", "v-");
        assert_eq!(desc.directive, "v-bind");
        assert_eq!(desc.kind, Some(DirectiveKind::Bind));
        assert_eq!(desc.argument.as_deref(), Some("xlink:href"));

        let desc = Descriptor::parse("v-if", "ok", "v-");
        assert_eq!(desc.kind, Some(DirectiveKind::If));
        assert_eq!(desc.argument, None);
    }

    #[test]
    fn unknown_names_have_no_kind() {
        let desc = Descriptor::parse("v-frobnicate", "x", "v-");
        assert_eq!(desc.kind, None);
        assert_eq!(
            desc.require_argument().unwrap_err(),
            CompileError::MissingArgument("v-frobnicate".into())
        );
    }

    #[test]
    fn custom_prefix() {
        let desc = Descriptor::parse("s-text", "x", "s-");
        assert_eq!(desc.kind, Some(DirectiveKind::Text));
        assert_eq!(Descriptor::parse("v-text", "x", "s-").kind, None);
    }

    #[test]
    fn markers_are_not_registered() {
        let registry = Registry::standard();
        for kind in [DirectiveKind::Pre, DirectiveKind::Cloak, DirectiveKind::Else] {
            assert!(kind.is_marker());
            assert!(!registry.contains(kind));
        }
        assert!(registry.contains(DirectiveKind::For));
        assert_eq!(DirectiveKind::parse(DirectiveKind::Show.name()), Some(DirectiveKind::Show));
    }
}
