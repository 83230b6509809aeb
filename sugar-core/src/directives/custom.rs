//! `custom:name`: hands the expression's value to a user-supplied update
//! function registered under `name`.

use std::rc::Rc;

use super::{watch, Directive, DirectiveContext, DirectiveKind};
use crate::dom::Node;
use crate::error::CompileError;
use crate::observer::Data;
use crate::reactive::Watcher;

/// Update function for a custom directive: `(new, old, node)`.
pub type CustomUpdate = Rc<dyn Fn(&Data, &Data, &Node)>;

struct CustomDirective {
    node: Node,
    watcher: Rc<Watcher>,
}

pub(super) fn create(context: &DirectiveContext<'_>) -> Result<Box<dyn Directive>, CompileError> {
    let name = context.descriptor.require_argument()?;
    let update = context
        .core
        .custom(name)
        .ok_or_else(|| CompileError::UnknownCustom(name.to_string()))?;
    let expression = context.descriptor.parse_expression()?;
    let node = context.node.clone();

    let target = node.clone();
    let callback = update.clone();
    let watcher = watch(context.scope, &expression, move |value, old| callback(value, old, &target));
    update(&watcher.value(), &Data::Null, &node);

    Ok(Box::new(CustomDirective { node, watcher }))
}

impl Directive for CustomDirective {
    fn kind(&self) -> DirectiveKind {
        DirectiveKind::Custom
    }

    fn node(&self) -> &Node {
        &self.node
    }

    fn destroy(&self) {
        self.watcher.teardown();
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::{element_from_html, Node};
    use crate::observer::{Data, Value};
    use crate::{Compiler, CompilerOptions};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn update_receives_new_old_and_node() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let log = calls.clone();

        let view = element_from_html(r#"<div><canvas v-custom:paint="color"></canvas></div>"#).unwrap();
        let options = CompilerOptions::new(view, Value::from(json!({"color": "red"}))).custom(
            "paint",
            move |new: &Data, old: &Data, node: &Node| {
                node.set_attribute("data-color", &new.to_display());
                log.borrow_mut().push((new.to_display(), old.to_display()));
            },
        );
        let compiler = Compiler::new(options).unwrap();
        compiler.model().unwrap().set("color", "blue").unwrap();

        assert_eq!(
            *calls.borrow(),
            vec![("red".to_string(), String::new()), ("blue".to_string(), "red".to_string())]
        );
        assert_eq!(
            compiler.element().inner_html(),
            r#"<canvas data-color="blue"></canvas>"#
        );
    }

    #[test]
    fn unknown_update_function_is_skipped() {
        let view = element_from_html(r#"<div><p v-custom:nope="x"></p></div>"#).unwrap();
        let compiler = Compiler::new(CompilerOptions::new(view, Value::from(json!({"x": 1})))).unwrap();
        assert_eq!(compiler.directive_count(), 0);
    }
}
