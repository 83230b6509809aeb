//! In-memory document nodes.
//!
//! A [`Node`] is a shared handle (`Rc<RefCell<..>>`) so the compiler, the
//! directives and the caller can all hold the same element. Children are
//! owned by their parent; the parent link is weak.
//!
//! Invariants:
//! - A node has at most one parent. Inserting a node detaches it first.
//! - Inserting a fragment moves the fragment's children, leaving it empty.
//! - Attribute order is insertion order.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::event::{Event, Handler, ListenerId};
use super::html;

/// What kind of node this is, with its kind-specific payload.
pub(crate) enum NodeKind {
    Element(ElementData),
    Text(String),
    Comment(String),
    Fragment,
}

pub(crate) struct ElementData {
    pub tag: String,
    pub attributes: IndexMap<String, String>,
    /// Form control state, separate from the `value`/`checked` attributes.
    pub value: Option<String>,
    pub checked: Option<bool>,
    pub listeners: Vec<Listener>,
}

pub(crate) struct Listener {
    pub id: ListenerId,
    pub event: String,
    pub handler: Handler,
}

pub(crate) struct NodeData {
    pub kind: NodeKind,
    parent: Weak<RefCell<NodeData>>,
    children: Vec<Node>,
}

/// Shared handle to a document node.
#[derive(Clone)]
pub struct Node(Rc<RefCell<NodeData>>);

/// Non-owning handle to a document node.
#[derive(Clone)]
pub struct WeakNode(Weak<RefCell<NodeData>>);

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.0.upgrade().map(Node)
    }
}

impl Node {
    fn from_kind(kind: NodeKind) -> Self {
        Self(Rc::new(RefCell::new(NodeData {
            kind,
            parent: Weak::new(),
            children: Vec::new(),
        })))
    }

    /// Create an element. Tag names are lowercased.
    pub fn element(tag: &str) -> Self {
        Self::from_kind(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attributes: IndexMap::new(),
            value: None,
            checked: None,
            listeners: Vec::new(),
        }))
    }

    pub fn text(data: &str) -> Self {
        Self::from_kind(NodeKind::Text(data.to_string()))
    }

    pub fn comment(data: &str) -> Self {
        Self::from_kind(NodeKind::Comment(data.to_string()))
    }

    pub fn fragment() -> Self {
        Self::from_kind(NodeKind::Fragment)
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode(Rc::downgrade(&self.0))
    }

    /// Stable identity for use as a map key while the node is alive.
    pub fn key(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub(crate) fn data(&self) -> std::cell::Ref<'_, NodeData> {
        self.0.borrow()
    }

    // ------------------------------------------------------------------
    // Kind
    // ------------------------------------------------------------------

    pub fn is_element(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Element(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Text(_))
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Comment(_))
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Fragment)
    }

    /// Lowercase tag name, or `None` for non-elements.
    pub fn tag_name(&self) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Element(element) => Some(element.tag.clone()),
            _ => None,
        }
    }

    fn with_element<R>(&self, f: impl FnOnce(&ElementData) -> R) -> Option<R> {
        match &self.0.borrow().kind {
            NodeKind::Element(element) => Some(f(element)),
            _ => None,
        }
    }

    fn with_element_mut<R>(&self, f: impl FnOnce(&mut ElementData) -> R) -> Option<R> {
        match &mut self.0.borrow_mut().kind {
            NodeKind::Element(element) => Some(f(element)),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    pub fn has_attributes(&self) -> bool {
        self.with_element(|element| !element.attributes.is_empty())
            .unwrap_or(false)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.with_element(|element| element.attributes.contains_key(name))
            .unwrap_or(false)
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.with_element(|element| element.attributes.get(name).cloned())
            .flatten()
    }

    /// Attribute names in document order.
    pub fn attribute_names(&self) -> Vec<String> {
        self.with_element(|element| element.attributes.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Attributes in document order.
    pub fn attributes(&self) -> Vec<(String, String)> {
        self.with_element(|element| {
            element
                .attributes
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default()
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        self.with_element_mut(|element| {
            element.attributes.insert(name.to_string(), value.to_string());
        });
    }

    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        self.with_element_mut(|element| element.attributes.shift_remove(name))
            .flatten()
    }

    // ------------------------------------------------------------------
    // Tree
    // ------------------------------------------------------------------

    pub fn parent(&self) -> Option<Node> {
        self.0.borrow().parent.upgrade().map(Node)
    }

    pub fn children(&self) -> Vec<Node> {
        self.0.borrow().children.clone()
    }

    pub fn has_child_nodes(&self) -> bool {
        !self.0.borrow().children.is_empty()
    }

    pub fn child_count(&self) -> usize {
        self.0.borrow().children.len()
    }

    pub fn first_child(&self) -> Option<Node> {
        self.0.borrow().children.first().cloned()
    }

    pub fn last_child(&self) -> Option<Node> {
        self.0.borrow().children.last().cloned()
    }

    fn index_in_parent(&self) -> Option<(Node, usize)> {
        let parent = self.parent()?;
        let index = parent
            .0
            .borrow()
            .children
            .iter()
            .position(|child| child.ptr_eq(self))?;
        Some((parent, index))
    }

    pub fn next_sibling(&self) -> Option<Node> {
        let (parent, index) = self.index_in_parent()?;
        let sibling = parent.0.borrow().children.get(index + 1).cloned();
        sibling
    }

    pub fn previous_sibling(&self) -> Option<Node> {
        let (parent, index) = self.index_in_parent()?;
        let sibling = index
            .checked_sub(1)
            .and_then(|i| parent.0.borrow().children.get(i).cloned());
        sibling
    }

    /// Next sibling that is an element, skipping text and comments.
    pub fn next_element_sibling(&self) -> Option<Node> {
        let mut current = self.next_sibling();
        while let Some(node) = current {
            if node.is_element() {
                return Some(node);
            }
            current = node.next_sibling();
        }
        None
    }

    /// Whether `self` is `other` or one of its ancestors.
    pub fn contains(&self, other: &Node) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node.ptr_eq(self) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Detach from the parent, if any.
    pub fn remove(&self) {
        if let Some(parent) = self.parent() {
            parent
                .0
                .borrow_mut()
                .children
                .retain(|child| !child.ptr_eq(self));
        }
        self.0.borrow_mut().parent = Weak::new();
    }

    /// Append `child`. A fragment contributes its children instead.
    pub fn append_child(&self, child: &Node) {
        self.insert_before(child, None);
    }

    /// Insert `child` before `reference`, or at the end when `reference` is
    /// `None` or not a child of this node.
    pub fn insert_before(&self, child: &Node, reference: Option<&Node>) {
        if child.is_fragment() {
            for grandchild in child.children() {
                self.insert_before(&grandchild, reference);
            }
            return;
        }
        if reference.is_some_and(|reference| reference.ptr_eq(child)) {
            return;
        }

        child.remove();
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);

        let mut data = self.0.borrow_mut();
        let index = reference.and_then(|reference| {
            data.children
                .iter()
                .position(|existing| existing.ptr_eq(reference))
        });
        match index {
            Some(index) => data.children.insert(index, child.clone()),
            None => data.children.push(child.clone()),
        }
    }

    /// Replace this node with `replacement` in its parent.
    pub fn replace_with(&self, replacement: &Node) {
        if let Some(parent) = self.parent() {
            parent.insert_before(replacement, Some(self));
            self.remove();
        }
    }

    /// Remove every child.
    pub fn clear_children(&self) {
        for child in self.children() {
            child.remove();
        }
    }

    /// Copy the node, and its subtree when `deep`. Listeners and form state
    /// are not copied.
    pub fn clone_node(&self, deep: bool) -> Node {
        let kind = match &self.0.borrow().kind {
            NodeKind::Element(element) => NodeKind::Element(ElementData {
                tag: element.tag.clone(),
                attributes: element.attributes.clone(),
                value: None,
                checked: None,
                listeners: Vec::new(),
            }),
            NodeKind::Text(data) => NodeKind::Text(data.clone()),
            NodeKind::Comment(data) => NodeKind::Comment(data.clone()),
            NodeKind::Fragment => NodeKind::Fragment,
        };

        let copy = Node::from_kind(kind);
        if deep {
            for child in self.children() {
                copy.append_child(&child.clone_node(true));
            }
        }
        copy
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    /// Text of a text/comment node, or the concatenated text of an
    /// element's descendants.
    pub fn text_content(&self) -> String {
        match &self.0.borrow().kind {
            NodeKind::Text(data) | NodeKind::Comment(data) => return data.clone(),
            NodeKind::Element(_) | NodeKind::Fragment => {}
        }

        self.children()
            .iter()
            .filter(|child| !child.is_comment())
            .map(Node::text_content)
            .collect()
    }

    /// Set the text of a text node, or replace an element's children with a
    /// single text node.
    pub fn set_text_content(&self, text: &str) {
        {
            let mut data = self.0.borrow_mut();
            if let NodeKind::Text(current) | NodeKind::Comment(current) = &mut data.kind {
                *current = text.to_string();
                return;
            }
        }

        self.clear_children();
        if !text.is_empty() {
            self.append_child(&Node::text(text));
        }
    }

    pub fn inner_html(&self) -> String {
        self.children().iter().map(html::serialize).collect()
    }

    pub fn outer_html(&self) -> String {
        html::serialize(self)
    }

    /// Replace the children with parsed `markup`.
    pub fn set_inner_html(&self, markup: &str) {
        self.clear_children();
        self.append_child(&html::parse(markup));
    }

    // ------------------------------------------------------------------
    // Form state
    // ------------------------------------------------------------------

    /// Current control value. Falls back to the `value` attribute; a
    /// `select` reports its selected option, a `textarea` its text.
    pub fn value(&self) -> String {
        let state = self.with_element(|element| (element.tag.clone(), element.value.clone()));
        let Some((tag, value)) = state else {
            return String::new();
        };
        if let Some(value) = value {
            return value;
        }

        match tag.as_str() {
            "select" => self
                .options()
                .into_iter()
                .find(|option| option.has_attribute("selected"))
                .or_else(|| self.options().into_iter().next())
                .map(|option| option.value())
                .unwrap_or_default(),
            "textarea" => self.text_content(),
            "option" => self
                .attribute("value")
                .unwrap_or_else(|| self.text_content()),
            _ => self.attribute("value").unwrap_or_default(),
        }
    }

    pub fn set_value(&self, value: &str) {
        let is_select = self.tag_name().as_deref() == Some("select");
        self.with_element_mut(|element| element.value = Some(value.to_string()));

        if is_select {
            for option in self.options() {
                if option.value() == value {
                    option.set_attribute("selected", "");
                } else {
                    option.remove_attribute("selected");
                }
            }
        }
    }

    /// `option` descendants of a `select`.
    fn options(&self) -> Vec<Node> {
        let mut found = Vec::new();
        let mut stack = self.children();
        stack.reverse();
        while let Some(node) = stack.pop() {
            if node.tag_name().as_deref() == Some("option") {
                found.push(node.clone());
            }
            let mut children = node.children();
            children.reverse();
            stack.extend(children);
        }
        found
    }

    /// Checked state, falling back to the `checked` attribute.
    pub fn checked(&self) -> bool {
        let state = self.with_element(|element| element.checked);
        match state.flatten() {
            Some(checked) => checked,
            None => self.has_attribute("checked"),
        }
    }

    pub fn set_checked(&self, checked: bool) {
        self.with_element_mut(|element| element.checked = Some(checked));
    }

    // ------------------------------------------------------------------
    // Style and class
    // ------------------------------------------------------------------

    /// Inline style declarations in order.
    pub fn style(&self) -> IndexMap<String, String> {
        parse_style(&self.attribute("style").unwrap_or_default())
    }

    pub fn style_property(&self, name: &str) -> Option<String> {
        self.style().get(name).cloned()
    }

    pub fn set_style_property(&self, name: &str, value: &str) {
        let mut style = self.style();
        style.insert(name.to_string(), value.to_string());
        self.write_style(&style);
    }

    pub fn remove_style_property(&self, name: &str) {
        let mut style = self.style();
        if style.shift_remove(name).is_some() {
            self.write_style(&style);
        }
    }

    fn write_style(&self, style: &IndexMap<String, String>) {
        if style.is_empty() {
            self.remove_attribute("style");
            return;
        }
        let text = style
            .iter()
            .map(|(name, value)| format!("{name}: {value};"))
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute("style", &text);
    }

    pub fn class_list(&self) -> Vec<String> {
        self.attribute("class")
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.class_list().iter().any(|class| class == name)
    }

    pub fn add_class(&self, name: &str) {
        let mut classes = self.class_list();
        if !classes.iter().any(|class| class == name) {
            classes.push(name.to_string());
            self.set_attribute("class", &classes.join(" "));
        }
    }

    pub fn remove_class(&self, name: &str) {
        let classes = self.class_list();
        if !classes.iter().any(|class| class == name) {
            return;
        }
        let remaining: Vec<_> = classes.into_iter().filter(|class| class != name).collect();
        if remaining.is_empty() {
            self.remove_attribute("class");
        } else {
            self.set_attribute("class", &remaining.join(" "));
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn add_event_listener(&self, event: &str, handler: impl Fn(&Event) + 'static) -> ListenerId {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = ListenerId(COUNTER.fetch_add(1, Ordering::Relaxed));

        self.with_element_mut(|element| {
            element.listeners.push(Listener {
                id,
                event: event.to_string(),
                handler: Rc::new(handler),
            });
        });
        id
    }

    pub fn remove_event_listener(&self, id: ListenerId) {
        self.with_element_mut(|element| element.listeners.retain(|listener| listener.id != id));
    }

    pub fn listener_count(&self) -> usize {
        self.with_element(|element| element.listeners.len())
            .unwrap_or(0)
    }

    /// Dispatch an event at this node. It bubbles through the ancestors.
    /// Returns the number of handlers invoked.
    pub fn dispatch_event(&self, event_type: &str) -> usize {
        let event = Event::new(event_type, self.clone());
        let mut invoked = 0;
        let mut current = Some(self.clone());

        while let Some(node) = current {
            let handlers: Vec<Handler> = node
                .with_element(|element| {
                    element
                        .listeners
                        .iter()
                        .filter(|listener| listener.event == event_type)
                        .map(|listener| listener.handler.clone())
                        .collect()
                })
                .unwrap_or_default();

            for handler in handlers {
                handler(&event.at(&node));
                invoked += 1;
            }
            current = node.parent();
        }
        invoked
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Node({})", self.outer_html())
    }
}

pub(crate) fn parse_style(text: &str) -> IndexMap<String, String> {
    text.split(';')
        .filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            let name = name.trim();
            let value = value.trim();
            (!name.is_empty()).then(|| (name.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn inserting_detaches_from_previous_parent() {
        let a = Node::element("div");
        let b = Node::element("div");
        let child = Node::text("x");

        a.append_child(&child);
        b.append_child(&child);
        assert_eq!(a.child_count(), 0);
        assert!(child.parent().unwrap().ptr_eq(&b));
    }

    #[test]
    fn fragments_move_their_children() {
        let fragment = Node::fragment();
        fragment.append_child(&Node::element("a"));
        fragment.append_child(&Node::element("b"));

        let root = Node::element("div");
        let anchor = Node::comment("anchor");
        root.append_child(&anchor);
        root.insert_before(&fragment, Some(&anchor));

        assert_eq!(fragment.child_count(), 0);
        assert_eq!(root.inner_html(), "<a></a><b></b><!--anchor-->");
    }

    #[test]
    fn siblings() {
        let root = Node::element("ul");
        let first = Node::element("li");
        let text = Node::text(" ");
        let second = Node::element("li");
        for node in [&first, &text, &second] {
            root.append_child(node);
        }

        assert!(first.next_sibling().unwrap().ptr_eq(&text));
        assert!(first.next_element_sibling().unwrap().ptr_eq(&second));
        assert!(second.previous_sibling().unwrap().ptr_eq(&text));
        assert!(second.next_sibling().is_none());
        assert!(root.contains(&second));
    }

    #[test]
    fn clone_copies_attributes_not_listeners() {
        let node = Node::element("button");
        node.set_attribute("id", "b");
        node.append_child(&Node::text("go"));
        node.add_event_listener("click", |_| {});

        let copy = node.clone_node(true);
        assert_eq!(copy.outer_html(), r#"<button id="b">go</button>"#);
        assert_eq!(copy.listener_count(), 0);
        assert!(!copy.ptr_eq(&node));
    }

    #[test]
    fn style_and_class_helpers() {
        let node = Node::element("p");
        node.set_attribute("style", "display:block;");
        node.set_style_property("color", "red");
        assert_eq!(node.attribute("style").unwrap(), "display: block; color: red;");
        node.remove_style_property("display");
        node.remove_style_property("color");
        assert!(!node.has_attribute("style"));

        node.add_class("a");
        node.add_class("b");
        node.add_class("a");
        assert_eq!(node.attribute("class").unwrap(), "a b");
        node.remove_class("a");
        node.remove_class("b");
        assert!(!node.has_attribute("class"));
    }

    #[test]
    fn events_bubble_to_ancestors() {
        let outer = Node::element("div");
        let inner = Node::element("span");
        outer.append_child(&inner);

        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let id = outer.add_event_listener("click", move |event| {
            assert_eq!(event.event_type(), "click");
            assert_eq!(event.target().tag_name().as_deref(), Some("span"));
            counter.set(counter.get() + 1);
        });

        assert_eq!(inner.dispatch_event("click"), 1);
        assert_eq!(inner.dispatch_event("input"), 0);
        outer.remove_event_listener(id);
        assert_eq!(inner.dispatch_event("click"), 0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn form_state_is_separate_from_attributes() {
        let input = Node::element("input");
        input.set_attribute("value", "initial");
        assert_eq!(input.value(), "initial");
        input.set_value("typed");
        assert_eq!(input.value(), "typed");
        assert_eq!(input.attribute("value").as_deref(), Some("initial"));

        let checkbox = Node::element("input");
        assert!(!checkbox.checked());
        checkbox.set_checked(true);
        assert!(checkbox.checked());
    }

    #[test]
    fn select_value_tracks_options() {
        let select = Node::element("select");
        select.set_inner_html(r#"<option value="a">A</option><option>b</option>"#);
        assert_eq!(select.value(), "a");

        select.set_value("b");
        let options = select.children();
        assert!(options[1].has_attribute("selected"));
        assert!(!options[0].has_attribute("selected"));
    }
}
