//! DOM events.

use std::rc::Rc;

use super::node::Node;

/// Handle returned by [`Node::add_event_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

pub(crate) type Handler = Rc<dyn Fn(&Event)>;

/// A dispatched event.
#[derive(Debug, Clone)]
pub struct Event {
    event_type: String,
    target: Node,
    current_target: Node,
}

impl Event {
    pub(crate) fn new(event_type: &str, target: Node) -> Self {
        Self {
            event_type: event_type.to_string(),
            current_target: target.clone(),
            target,
        }
    }

    /// The same event as seen by a listener on `node`.
    pub(crate) fn at(&self, node: &Node) -> Self {
        Self {
            event_type: self.event_type.clone(),
            target: self.target.clone(),
            current_target: node.clone(),
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The node the event was dispatched at.
    pub fn target(&self) -> &Node {
        &self.target
    }

    /// The node whose listener is running.
    pub fn current_target(&self) -> &Node {
        &self.current_target
    }
}
