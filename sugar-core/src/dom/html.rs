//! Markup parsing and serialization.
//!
//! The parser is forgiving in the way template markup needs: unknown tags
//! are accepted, void elements never take children, a stray end tag closes
//! the nearest matching open element and is otherwise ignored.

use std::iter::Peekable;
use std::str::CharIndices;

use super::node::{Node, NodeKind};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub(crate) fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Parse `markup` into a fragment.
pub(crate) fn parse(markup: &str) -> Node {
    let fragment = Node::fragment();
    let mut stack = vec![fragment.clone()];
    let mut reader = Reader::new(markup);

    while let Some(token) = reader.next_token() {
        let Some(top) = stack.last().cloned() else {
            break;
        };
        match token {
            HtmlToken::Text(text) => top.append_child(&Node::text(&decode_entities(&text))),
            HtmlToken::Comment(text) => top.append_child(&Node::comment(&text)),
            HtmlToken::Start {
                tag,
                attributes,
                self_closing,
            } => {
                let element = Node::element(&tag);
                for (name, value) in attributes {
                    element.set_attribute(&name, &decode_entities(&value));
                }
                top.append_child(&element);

                if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
                    let text = reader.raw_text(&tag);
                    if !text.is_empty() {
                        element.append_child(&Node::text(&text));
                    }
                } else if !self_closing && !is_void(&tag) {
                    stack.push(element);
                }
            }
            HtmlToken::End(tag) => {
                let open = stack
                    .iter()
                    .skip(1)
                    .rposition(|node| node.tag_name().as_deref() == Some(tag.as_str()));
                if let Some(index) = open {
                    stack.truncate(index + 1);
                }
            }
        }
    }
    fragment
}

/// Serialize a node and its subtree.
pub(crate) fn serialize(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn write_node(node: &Node, out: &mut String) {
    let tag = {
        let data = node.data();
        match &data.kind {
            NodeKind::Text(text) => {
                out.push_str(&escape_text(text));
                return;
            }
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
                return;
            }
            NodeKind::Fragment => None,
            NodeKind::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                for (name, value) in &element.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }
                out.push('>');
                Some(element.tag.clone())
            }
        }
    };

    if tag.as_deref().is_some_and(is_void) {
        return;
    }
    for child in node.children() {
        write_node(&child, out);
    }
    if let Some(tag) = tag {
        out.push_str("</");
        out.push_str(&tag);
        out.push('>');
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];

        let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            }?;
            Some((c, end))
        });

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

enum HtmlToken {
    Text(String),
    Comment(String),
    Start {
        tag: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
    },
    End(String),
}

struct Reader<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Reader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.source.len(), |&(i, _)| i)
    }

    fn rest(&mut self) -> &'a str {
        let offset = self.offset();
        &self.source[offset..]
    }

    fn skip(&mut self, bytes: usize) {
        let target = self.offset() + bytes;
        while self.offset() < target {
            self.chars.next();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.chars.peek().is_some_and(|&(_, c)| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn next_token(&mut self) -> Option<HtmlToken> {
        let rest = self.rest();
        if rest.is_empty() {
            return None;
        }

        if let Some(body) = rest.strip_prefix("<!--") {
            let end = body.find("-->").unwrap_or(body.len());
            let text = body[..end].to_string();
            self.skip(4 + end + 3usize.min(body.len() - end));
            return Some(HtmlToken::Comment(text));
        }

        if rest.starts_with("<!") {
            let end = rest.find('>').map_or(rest.len(), |i| i + 1);
            self.skip(end);
            return self.next_token();
        }

        if let Some(body) = rest.strip_prefix("</") {
            let end = body.find('>').unwrap_or(body.len());
            let tag = body[..end].trim().to_ascii_lowercase();
            self.skip(2 + end + 1usize.min(body.len() - end));
            return Some(HtmlToken::End(tag));
        }

        if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Some(self.start_tag());
        }

        let first = rest.chars().next().map_or(0, char::len_utf8);
        let end = rest[first..].find('<').map_or(rest.len(), |i| i + first);
        let text = rest[..end].to_string();
        self.skip(end);
        Some(HtmlToken::Text(text))
    }

    fn name(&mut self) -> String {
        let mut name = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() || matches!(c, '>' | '/' | '=') {
                break;
            }
            name.push(c);
            self.chars.next();
        }
        name.to_ascii_lowercase()
    }

    fn start_tag(&mut self) -> HtmlToken {
        self.chars.next();
        let tag = self.name();
        let mut attributes = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            match self.chars.peek().map(|&(_, c)| c) {
                None => break,
                Some('>') => {
                    self.chars.next();
                    break;
                }
                Some('/') => {
                    self.chars.next();
                    self_closing = true;
                }
                Some(_) => {
                    let name = self.name();
                    if name.is_empty() {
                        // Stray `=`; skip it.
                        self.chars.next();
                        continue;
                    }
                    self.skip_whitespace();
                    let value = if self.chars.peek().is_some_and(|&(_, c)| c == '=') {
                        self.chars.next();
                        self.skip_whitespace();
                        self.attribute_value()
                    } else {
                        String::new()
                    };
                    attributes.push((name, value));
                    self_closing = false;
                }
            }
        }

        HtmlToken::Start {
            tag,
            attributes,
            self_closing,
        }
    }

    fn attribute_value(&mut self) -> String {
        let mut value = String::new();
        match self.chars.peek().map(|&(_, c)| c) {
            Some(quote @ ('"' | '\'')) => {
                self.chars.next();
                for (_, c) in self.chars.by_ref() {
                    if c == quote {
                        break;
                    }
                    value.push(c);
                }
            }
            _ => {
                while let Some(&(_, c)) = self.chars.peek() {
                    if c.is_whitespace() || c == '>' {
                        break;
                    }
                    value.push(c);
                    self.chars.next();
                }
            }
        }
        value
    }

    /// Everything up to `</tag>`, consumed along with the end tag.
    fn raw_text(&mut self, tag: &str) -> String {
        let rest = self.rest();
        let close = format!("</{tag}");
        let end = rest.to_ascii_lowercase().find(&close).unwrap_or(rest.len());
        let text = rest[..end].to_string();
        self.skip(end);
        if !self.rest().is_empty() {
            let close_end = self.rest().find('>').map_or(self.rest().len(), |i| i + 1);
            self.skip(close_end);
        }
        text
    }
}
