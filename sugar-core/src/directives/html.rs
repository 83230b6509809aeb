//! `html`: renders an expression as markup and compiles the result.
//!
//! On an element the markup replaces the element's children. For a
//! `{{{ }}}` text node the text node is emptied and kept as an anchor; the
//! markup is inserted right before it, so siblings are left alone.

use std::cell::RefCell;
use std::rc::Rc;

use super::{destroy_all, watch, Directive, DirectiveContext, DirectiveKind};
use crate::compiler::CompilerCore;
use crate::dom::{self, Node};
use crate::error::CompileError;
use crate::expression::Scope;
use crate::reactive::Watcher;

enum Target {
    Element(Node),
    Range { anchor: Node, nodes: RefCell<Vec<Node>> },
}

struct Content {
    core: Rc<CompilerCore>,
    scope: Scope,
    target: Target,
    /// Directives compiled inside the rendered markup.
    children: RefCell<Vec<Box<dyn Directive>>>,
}

impl Content {
    fn render(&self, markup: &str) {
        destroy_all(self.children.take());

        let fragment = dom::parse_html(markup);
        let directives = self.core.compile_subtree(&fragment, false, &self.scope);

        match &self.target {
            Target::Element(element) => {
                element.clear_children();
                element.append_child(&fragment);
            }
            Target::Range { anchor, nodes } => {
                for node in nodes.take() {
                    node.remove();
                }
                *nodes.borrow_mut() = fragment.children();
                if let Some(parent) = anchor.parent() {
                    parent.insert_before(&fragment, Some(anchor));
                }
            }
        }
        *self.children.borrow_mut() = directives;
    }

    fn clear(&self) {
        destroy_all(self.children.take());
    }
}

struct HtmlDirective {
    node: Node,
    watcher: Rc<Watcher>,
    content: Rc<Content>,
}

pub(super) fn create(context: &DirectiveContext<'_>) -> Result<Box<dyn Directive>, CompileError> {
    let expression = context.descriptor.parse_expression()?;
    let node = context.node.clone();

    let target = if node.is_text() {
        node.set_text_content("");
        Target::Range {
            anchor: node.clone(),
            nodes: RefCell::new(Vec::new()),
        }
    } else {
        Target::Element(node.clone())
    };
    let content = Rc::new(Content {
        core: context.core.clone(),
        scope: context.scope.clone(),
        target,
        children: RefCell::new(Vec::new()),
    });

    let renderer = content.clone();
    let watcher = watch(context.scope, &expression, move |value, _| {
        renderer.render(&value.to_display());
    });
    content.render(&watcher.value().to_display());

    Ok(Box::new(HtmlDirective { node, watcher, content }))
}

impl Directive for HtmlDirective {
    fn kind(&self) -> DirectiveKind {
        DirectiveKind::Html
    }

    fn node(&self) -> &Node {
        &self.node
    }

    fn destroy(&self) {
        self.watcher.teardown();
        self.content.clear();
    }
}
