//! Document Model
//!
//! A small in-memory DOM: elements, text, comments and fragments, markup
//! parsing and serialization, inline style and class helpers, form control
//! state and bubbling events. It is what templates are compiled against.
//!
//! The free functions mirror the utility layer the compiler needs:
//!
//! - [`node_to_fragment`] detaches an element's children into a fragment
//! - [`empty`] removes every child of an element
//! - [`parse_html`] turns markup into a fragment

mod event;
mod html;
mod node;

pub use event::{Event, ListenerId};
pub use node::{Node, WeakNode};
pub(crate) use node::parse_style;

pub fn is_element(node: &Node) -> bool {
    node.is_element()
}

pub fn is_text_node(node: &Node) -> bool {
    node.is_text()
}

/// Move every child of `element` into a new fragment.
pub fn node_to_fragment(element: &Node) -> Node {
    let fragment = Node::fragment();
    for child in element.children() {
        fragment.append_child(&child);
    }
    fragment
}

/// Remove every child of `element`.
pub fn empty(element: &Node) {
    element.clear_children();
}

/// Parse markup into a fragment.
pub fn parse_html(markup: &str) -> Node {
    html::parse(markup)
}

/// Parse markup that holds a single root element, e.g. a view template.
pub fn element_from_html(markup: &str) -> Option<Node> {
    let fragment = parse_html(markup);
    let mut elements = fragment.children().into_iter().filter(Node::is_element);
    let element = elements.next()?;
    element.remove();
    Some(element)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_round_trip() {
        let root = element_from_html("<div><p>a</p><p>b</p></div>").unwrap();
        let fragment = node_to_fragment(&root);
        assert_eq!(root.child_count(), 0);
        assert_eq!(fragment.child_count(), 2);

        root.append_child(&fragment);
        assert_eq!(root.outer_html(), "<div><p>a</p><p>b</p></div>");

        empty(&root);
        assert_eq!(root.inner_html(), "");
    }

    #[test]
    fn element_from_html_skips_surrounding_text() {
        let root = element_from_html("\n  <section id=\"app\"></section>\n").unwrap();
        assert_eq!(root.attribute("id").as_deref(), Some("app"));
        assert!(root.parent().is_none());
        assert!(element_from_html("just text").is_none());
    }
}
