//! Mustache interpolation in text nodes.
//!
//! `{{ expr }}` is escaped text; `{{{ expr }}}` is raw markup and must be
//! the whole (trimmed) content of its text node.

use crate::error::CompileError;

/// How a text node binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TextBinding {
    /// Escaped text, as a single concatenation expression.
    Text(String),
    /// Raw markup expression.
    Html(String),
}

/// Whether `text` contains any interpolation marker.
pub(crate) fn has_mustache(text: &str) -> bool {
    text.find("{{")
        .is_some_and(|start| text[start + 2..].contains("}}"))
}

/// Classify a text node's content.
pub(crate) fn parse(text: &str) -> Result<Option<TextBinding>, CompileError> {
    let trimmed = text.trim();

    if let Some((start, end, inner)) = find_delimited(trimmed, "{{{", "}}}") {
        if start != 0 || end != trimmed.len() {
            return Err(CompileError::MixedHtmlInterpolation(trimmed.to_string()));
        }
        return Ok(Some(TextBinding::Html(inner.trim().to_string())));
    }

    let mut tokens = Vec::new();
    let mut rest = text;
    let mut has_expression = false;
    while let Some((start, end, inner)) = find_delimited(rest, "{{", "}}") {
        if start > 0 {
            tokens.push(quote(&rest[..start]));
        }
        tokens.push(format!("({})", inner.trim()));
        has_expression = true;
        rest = &rest[end..];
    }
    if !rest.is_empty() {
        tokens.push(quote(rest));
    }

    Ok(has_expression.then(|| TextBinding::Text(tokens.join(" + "))))
}

/// First non-empty `open ... close` span: `(start, end, inner)`.
fn find_delimited<'a>(text: &'a str, open: &str, close: &str) -> Option<(usize, usize, &'a str)> {
    let mut from = 0;
    while let Some(offset) = text[from..].find(open) {
        let start = from + offset;
        let inner_start = start + open.len();
        let inner_len = text[inner_start..].find(close)?;
        let inner = &text[inner_start..inner_start + inner_len];
        if !inner.trim().is_empty() {
            return Some((start, inner_start + inner_len + close.len(), inner));
        }
        from = inner_start;
    }
    None
}

/// Quote literal text as an expression string.
fn quote(literal: &str) -> String {
    let mut quoted = String::with_capacity(literal.len() + 2);
    quoted.push('"');
    for c in literal.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}
