//! `text`: keeps a node's text in step with an expression. Also used for
//! `{{ }}` interpolation in text nodes.

use std::rc::Rc;

use super::{watch, Directive, DirectiveContext, DirectiveKind};
use crate::dom::Node;
use crate::error::CompileError;
use crate::reactive::Watcher;

struct TextDirective {
    node: Node,
    watcher: Rc<Watcher>,
}

pub(super) fn create(context: &DirectiveContext<'_>) -> Result<Box<dyn Directive>, CompileError> {
    let expression = context.descriptor.parse_expression()?;
    let node = context.node.clone();

    let target = node.clone();
    let watcher = watch(context.scope, &expression, move |value, _| {
        target.set_text_content(&value.to_display());
    });
    node.set_text_content(&watcher.value().to_display());

    Ok(Box::new(TextDirective { node, watcher }))
}

impl Directive for TextDirective {
    fn kind(&self) -> DirectiveKind {
        DirectiveKind::Text
    }

    fn node(&self) -> &Node {
        &self.node
    }

    fn destroy(&self) {
        self.watcher.teardown();
    }
}
