//! `on:event`: runs a handler when the node receives an event.
//!
//! A bare method name is called with the event; anything else is evaluated
//! as a statement with `$event` in scope, e.g. `count = count + 1` or
//! `remove($index)`.

use indexmap::IndexMap;

use super::{Directive, DirectiveContext, DirectiveKind};
use crate::dom::{Event, ListenerId, Node};
use crate::error::{CompileError, ExprError};
use crate::expression::{Expression, Scope};
use crate::observer::{Data, ObjectRef};

struct OnDirective {
    node: Node,
    listener: ListenerId,
}

/// `$event`: the type plus the target's value and checked state.
fn event_data(event: &Event, scope: &Scope) -> Data {
    let target = event.target();
    let mut entries = IndexMap::new();
    entries.insert("type".to_string(), Data::string(event.event_type()));
    entries.insert("value".to_string(), Data::string(target.value()));
    entries.insert("checked".to_string(), Data::Bool(target.checked()));
    Data::Object(ObjectRef::from_entries(entries, scope.model().runtime()))
}

fn handle(event: &Event, expression: &Expression, scope: &Scope) -> Result<(), ExprError> {
    let event = event_data(event, scope);

    if let Some(name) = expression.as_identifier() {
        let method = scope
            .method(name)
            .ok_or_else(|| ExprError::UnknownMethod(name.to_string()))?;
        method(scope.model(), &[event]);
        return Ok(());
    }

    let mut locals = IndexMap::new();
    locals.insert("$event".to_string(), event);
    expression.evaluate(&scope.child(locals)).map(drop)
}

pub(super) fn create(context: &DirectiveContext<'_>) -> Result<Box<dyn Directive>, CompileError> {
    let event_type = context.descriptor.require_argument()?.to_string();
    let expression = context.descriptor.parse_expression()?;
    let node = context.node.clone();

    let scope = context.scope.clone();
    let listener = node.add_event_listener(&event_type, move |event| {
        if let Err(error) = handle(event, &expression, &scope) {
            tracing::warn!(expression = %expression.source(), %error, "event handler failed");
        }
    });

    Ok(Box::new(OnDirective { node, listener }))
}

impl Directive for OnDirective {
    fn kind(&self) -> DirectiveKind {
        DirectiveKind::On
    }

    fn node(&self) -> &Node {
        &self.node
    }

    fn destroy(&self) {
        self.node.remove_event_listener(self.listener);
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::element_from_html;
    use crate::observer::{Data, Model, Value};
    use crate::{Compiler, CompilerOptions};
    use serde_json::json;

    #[test]
    fn calls_named_method_with_event() {
        let view = element_from_html(r#"<div><button v-on:click="clicked">{{ last }}</button></div>"#).unwrap();
        let options = CompilerOptions::new(view, Value::from(json!({"last": ""}))).method(
            "clicked",
            |model: &Model, args: &[Data]| {
                let kind = args[0].as_object().unwrap().get("type");
                model.set_data("last", kind).unwrap();
                Value::Null
            },
        );
        let compiler = Compiler::new(options).unwrap();

        let button = compiler.element().first_child().unwrap();
        assert_eq!(button.dispatch_event("click"), 1);
        assert_eq!(compiler.element().inner_html(), "<button>click</button>");
    }

    #[test]
    fn inline_statements() {
        let view = element_from_html(
            r#"<div><ul><li v-for="item in items" v-on:click="pick(item, $index)"></li></ul><b v-on:click="count = count + 1"></b></div>"#,
        )
        .unwrap();
        let options = CompilerOptions::new(view, Value::from(json!({"items": ["a", "b"], "count": 0, "picked": ""})))
            .method("pick", |model: &Model, args: &[Data]| {
                let label = format!("{}{}", args[0].to_display(), args[1].to_display());
                model.set("picked", label).unwrap();
                Value::Null
            });
        let compiler = Compiler::new(options).unwrap();
        let model = compiler.model().unwrap();

        let list = compiler.element().first_child().unwrap();
        list.children()[1].dispatch_event("click");
        assert_eq!(model.get("picked").unwrap().as_str(), Some("b1"));

        let bold = compiler.element().last_child().unwrap();
        bold.dispatch_event("click");
        bold.dispatch_event("click");
        assert_eq!(model.get("count").unwrap().as_number(), Some(2.0));
    }

    #[test]
    fn event_value_is_in_scope() {
        let view = element_from_html(r#"<div><input value="typed" v-on:input="text = $event.value"></div>"#).unwrap();
        let compiler = Compiler::new(CompilerOptions::new(view, Value::from(json!({"text": ""})))).unwrap();
        compiler.element().first_child().unwrap().dispatch_event("input");
        assert_eq!(compiler.model().unwrap().get("text").unwrap().as_str(), Some("typed"));
    }

    #[test]
    fn missing_argument_is_skipped() {
        let view = element_from_html(r#"<div><b v-on="go"></b></div>"#).unwrap();
        let compiler = Compiler::new(CompilerOptions::new(view, Value::from(json!({})))).unwrap();
        assert_eq!(compiler.directive_count(), 0);
    }
}
