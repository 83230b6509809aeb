//! `el:name` (or `el="name"`): registers the node with the compiler so it
//! can be looked up with `Compiler::element_ref`.

use std::rc::Rc;

use super::{Directive, DirectiveContext, DirectiveKind};
use crate::compiler::CompilerCore;
use crate::dom::Node;
use crate::error::CompileError;

struct ElDirective {
    node: Node,
    name: String,
    core: Rc<CompilerCore>,
}

pub(super) fn create(context: &DirectiveContext<'_>) -> Result<Box<dyn Directive>, CompileError> {
    let name = match context.descriptor.argument.as_deref() {
        Some(argument) if !argument.is_empty() => argument.to_string(),
        _ => context.descriptor.expression.trim().to_string(),
    };
    if name.is_empty() {
        return Err(CompileError::MissingArgument(context.descriptor.attr.clone()));
    }

    context.core.register_el(&name, context.node);
    Ok(Box::new(ElDirective {
        node: context.node.clone(),
        name,
        core: context.core.clone(),
    }))
}

impl Directive for ElDirective {
    fn kind(&self) -> DirectiveKind {
        DirectiveKind::El
    }

    fn node(&self) -> &Node {
        &self.node
    }

    fn destroy(&self) {
        self.core.unregister_el(&self.name, &self.node);
    }
}
