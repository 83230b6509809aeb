//! `model`: two-way binding between a form control and an assignable path.
//!
//! The model value is pushed into the control by a watcher; control events
//! (`input` for text fields, `change` for checkboxes, radios and selects)
//! write back through the expression.

use std::rc::Rc;

use super::{watch, Directive, DirectiveContext, DirectiveKind};
use crate::dom::{ListenerId, Node};
use crate::error::{CompileError, ExprError};
use crate::expression::{Expression, Scope};
use crate::observer::Data;
use crate::reactive::Watcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Text { number: bool },
    Checkbox,
    Radio { number: bool },
    Select { number: bool },
}

impl Control {
    fn of(node: &Node) -> Self {
        let tag = node.tag_name().unwrap_or_default();
        let kind = node.attribute("type").unwrap_or_default().to_ascii_lowercase();
        let number = node.has_attribute("number") || kind == "number";

        match (tag.as_str(), kind.as_str()) {
            ("input", "checkbox") => Self::Checkbox,
            ("input", "radio") => Self::Radio { number },
            ("select", _) => Self::Select { number },
            _ => Self::Text { number },
        }
    }

    fn event(self) -> &'static str {
        match self {
            Self::Text { .. } => "input",
            Self::Checkbox | Self::Radio { .. } | Self::Select { .. } => "change",
        }
    }

    /// Push the model value into the control.
    fn render(self, node: &Node, value: &Data) {
        match self {
            Self::Text { .. } | Self::Select { .. } => {
                let text = value.to_display();
                if node.value() != text {
                    node.set_value(&text);
                }
            }
            Self::Checkbox => {
                let checked = match value {
                    Data::Array(array) => {
                        let own = node.value();
                        array.items_untracked().iter().any(|item| item.to_display() == own)
                    }
                    other => other.truthy(),
                };
                node.set_checked(checked);
            }
            Self::Radio { .. } => node.set_checked(value.to_display() == node.value()),
        }
    }
}

/// Control text as model data, as a number when asked for and parseable.
fn coerce(text: String, number: bool) -> Data {
    if number {
        if let Ok(n) = text.trim().parse::<f64>() {
            return Data::Number(n);
        }
    }
    Data::string(text)
}

/// Write the control's state back into the model.
fn write_back(control: Control, node: &Node, expression: &Expression, scope: &Scope) -> Result<(), ExprError> {
    match control {
        Control::Text { number } | Control::Select { number } => {
            expression.assign(scope, coerce(node.value(), number))
        }
        Control::Radio { number } => {
            if node.checked() {
                expression.assign(scope, coerce(node.value(), number))
            } else {
                Ok(())
            }
        }
        Control::Checkbox => match expression.evaluate(scope)? {
            Data::Array(array) => {
                let own = node.value();
                let position = array
                    .items_untracked()
                    .iter()
                    .position(|item| item.to_display() == own);
                match (node.checked(), position) {
                    (true, None) => {
                        array.push_data(Data::string(own));
                    }
                    (false, Some(index)) => {
                        array.splice(index, 1, Vec::new());
                    }
                    _ => {}
                }
                Ok(())
            }
            _ => expression.assign(scope, Data::Bool(node.checked())),
        },
    }
}

struct ModelDirective {
    node: Node,
    watcher: Rc<Watcher>,
    listener: ListenerId,
}

pub(super) fn create(context: &DirectiveContext<'_>) -> Result<Box<dyn Directive>, CompileError> {
    let expression = context.descriptor.parse_expression()?;
    if !expression.is_assignable() {
        let source = expression.source().to_string();
        return Err(CompileError::expression(&source, ExprError::NotAssignable(source.clone())));
    }

    let node = context.node.clone();
    let control = Control::of(&node);

    let target = node.clone();
    let watcher = watch(context.scope, &expression, move |value, _| control.render(&target, value));
    control.render(&node, &watcher.value());

    let scope = context.scope.clone();
    let listener = node.add_event_listener(control.event(), move |event| {
        if let Err(error) = write_back(control, event.current_target(), &expression, &scope) {
            tracing::warn!(expression = %expression.source(), %error, "model write failed");
        }
    });

    Ok(Box::new(ModelDirective { node, watcher, listener }))
}

impl Directive for ModelDirective {
    fn kind(&self) -> DirectiveKind {
        DirectiveKind::Model
    }

    fn node(&self) -> &Node {
        &self.node
    }

    fn destroy(&self) {
        self.watcher.teardown();
        self.node.remove_event_listener(self.listener);
    }
}
