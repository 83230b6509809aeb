//! `if` and its `else` sibling.
//!
//! The element's children are moved into a template when the directive is
//! created. Each time the expression turns truthy the template is cloned
//! back in and compiled against the directive's scope; when it turns falsy
//! those bindings are destroyed and the element is swapped for a comment.
//! An element right after it carrying `else` is shown exactly when the
//! `if` element is not.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{destroy_all, watch, Directive, DirectiveContext, DirectiveKind};
use crate::compiler::CompilerCore;
use crate::dom::{self, Node};
use crate::error::CompileError;
use crate::expression::Scope;
use crate::reactive::Watcher;

/// An element that is swapped with a comment when hidden.
struct Slot {
    node: Node,
    anchor: Node,
}

impl Slot {
    fn new(node: &Node, label: &str) -> Self {
        Self {
            node: node.clone(),
            anchor: Node::comment(label),
        }
    }

    fn attach(&self) {
        if self.anchor.parent().is_some() {
            self.anchor.replace_with(&self.node);
        }
    }

    fn detach(&self) {
        if self.node.parent().is_some() {
            self.node.replace_with(&self.anchor);
        }
    }

    fn is_attached(&self) -> bool {
        self.anchor.parent().is_none()
    }
}

struct Branches {
    core: Rc<CompilerCore>,
    scope: Scope,
    primary: Slot,
    template: Node,
    alternate: Option<Slot>,
    children: RefCell<Vec<Box<dyn Directive>>>,
    shown: Cell<bool>,
}

impl Branches {
    fn toggle(&self, truthy: bool) {
        if truthy != self.shown.get() {
            self.render(truthy);
        }
    }

    fn render(&self, truthy: bool) {
        self.shown.set(truthy);
        if truthy {
            self.primary.attach();
            self.primary.node.append_child(&self.template.clone_node(true));
            let directives = self.core.compile_subtree(&self.primary.node, false, &self.scope);
            *self.children.borrow_mut() = directives;
            if let Some(alternate) = &self.alternate {
                alternate.detach();
            }
        } else {
            self.clear();
            self.primary.detach();
            if let Some(alternate) = &self.alternate {
                alternate.attach();
            }
        }
    }

    fn clear(&self) {
        destroy_all(self.children.take());
        dom::empty(&self.primary.node);
    }
}

struct ConditionDirective {
    node: Node,
    watcher: Rc<Watcher>,
    branches: Rc<Branches>,
}

pub(super) fn create(context: &DirectiveContext<'_>) -> Result<Box<dyn Directive>, CompileError> {
    let expression = context.descriptor.parse_expression()?;
    let node = context.node.clone();

    let else_attr = context.core.attr("else");
    let alternate = node
        .next_element_sibling()
        .filter(|sibling| sibling.has_attribute(&else_attr))
        .map(|sibling| Slot::new(&sibling, &else_attr));

    let branches = Rc::new(Branches {
        core: context.core.clone(),
        scope: context.scope.clone(),
        primary: Slot::new(&node, &context.descriptor.directive),
        template: dom::node_to_fragment(&node),
        alternate,
        children: RefCell::new(Vec::new()),
        shown: Cell::new(false),
    });

    let toggler = branches.clone();
    let watcher = watch(context.scope, &expression, move |value, _| {
        toggler.toggle(value.truthy());
    });
    branches.render(watcher.value().truthy());

    Ok(Box::new(ConditionDirective { node, watcher, branches }))
}

impl Directive for ConditionDirective {
    fn kind(&self) -> DirectiveKind {
        DirectiveKind::If
    }

    fn node(&self) -> &Node {
        &self.node
    }

    fn destroy(&self) {
        self.watcher.teardown();
        destroy_all(self.branches.children.take());
    }

    fn placeholder(&self) -> Option<Node> {
        let primary = &self.branches.primary;
        (!primary.is_attached()).then(|| primary.anchor.clone())
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::element_from_html;
    use crate::observer::Value;
    use crate::{Compiler, CompilerOptions};
    use serde_json::json;

    fn compile(markup: &str, model: serde_json::Value) -> Compiler {
        let view = element_from_html(markup).unwrap();
        Compiler::new(CompilerOptions::new(view, Value::from(model))).unwrap()
    }

    #[test]
    fn toggles_between_branches() {
        let compiler = compile(
            r#"<div><p v-if="ok">{{ msg }}</p><p v-else>no</p></div>"#,
            json!({"ok": true, "msg": "hi"}),
        );
        let model = compiler.model().unwrap();
        assert_eq!(compiler.element().inner_html(), "<p>hi</p><!--v-else-->");

        model.set("ok", false).unwrap();
        assert_eq!(compiler.element().inner_html(), "<!--v-if--><p>no</p>");

        model.set("msg", "back").unwrap();
        model.set("ok", true).unwrap();
        assert_eq!(compiler.element().inner_html(), "<p>back</p><!--v-else-->");
    }

    #[test]
    fn hidden_branch_bindings_are_torn_down() {
        let compiler = compile(r#"<div><p v-if="ok">{{ msg }}</p></div>"#, json!({"ok": true, "msg": "a"}));
        let model = compiler.model().unwrap();
        assert_eq!(compiler.runtime().active_watchers(), 2);

        model.set("ok", false).unwrap();
        assert_eq!(compiler.runtime().active_watchers(), 1);
        assert_eq!(model.root().property_dep("msg").unwrap().subscriber_count(), 0);
    }

    #[test]
    fn starts_hidden() {
        let compiler = compile(r#"<div><p v-if="ok">{{ msg }}</p></div>"#, json!({"ok": 0, "msg": "a"}));
        assert_eq!(compiler.element().inner_html(), "<!--v-if-->");

        compiler.model().unwrap().set("ok", 1).unwrap();
        assert_eq!(compiler.element().inner_html(), "<p>a</p>");
    }

    #[test]
    fn same_truthiness_does_not_rebuild() {
        let compiler = compile(r#"<div><p v-if="n">{{ n }}</p></div>"#, json!({"n": 1}));
        let model = compiler.model().unwrap();
        let before = compiler.element().first_child().unwrap().first_child().unwrap();

        model.set("n", 2).unwrap();
        let after = compiler.element().first_child().unwrap().first_child().unwrap();
        assert!(before.ptr_eq(&after));
        assert_eq!(compiler.element().inner_html(), "<p>2</p>");
    }
}
