//! Compile queue.

use std::collections::VecDeque;

use crate::dom::Node;
use crate::expression::Scope;

/// Ordered worklist of nodes awaiting directive instantiation, each with
/// the scope its expressions resolve in.
#[derive(Default)]
pub struct CompileQueue {
    entries: VecDeque<(Node, Scope)>,
}

impl CompileQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: Node, scope: Scope) {
        self.entries.push_back((node, scope));
    }

    pub fn pop(&mut self) -> Option<(Node, Scope)> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
