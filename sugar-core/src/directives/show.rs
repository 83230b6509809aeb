//! `show`: toggles `display: none` without touching the subtree.

use std::rc::Rc;

use super::{watch, Directive, DirectiveContext, DirectiveKind};
use crate::dom::Node;
use crate::error::CompileError;
use crate::observer::Data;
use crate::reactive::Watcher;

struct ShowDirective {
    node: Node,
    watcher: Rc<Watcher>,
}

fn apply(node: &Node, initial: Option<&str>, value: &Data) {
    match (value.truthy(), initial) {
        (false, _) => node.set_style_property("display", "none"),
        (true, Some(display)) if display != "none" => node.set_style_property("display", display),
        (true, _) => node.remove_style_property("display"),
    }
}

pub(super) fn create(context: &DirectiveContext<'_>) -> Result<Box<dyn Directive>, CompileError> {
    let expression = context.descriptor.parse_expression()?;
    let node = context.node.clone();
    let initial = node.style_property("display");

    let target = node.clone();
    let restore = initial.clone();
    let watcher = watch(context.scope, &expression, move |value, _| {
        apply(&target, restore.as_deref(), value);
    });
    apply(&node, initial.as_deref(), &watcher.value());

    Ok(Box::new(ShowDirective { node, watcher }))
}

impl Directive for ShowDirective {
    fn kind(&self) -> DirectiveKind {
        DirectiveKind::Show
    }

    fn node(&self) -> &Node {
        &self.node
    }

    fn destroy(&self) {
        self.watcher.teardown();
    }
}
