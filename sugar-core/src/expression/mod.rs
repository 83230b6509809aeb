//! Binding Expressions
//!
//! Directive values are small script-like expressions evaluated against a
//! [`Scope`]. This module parses them once and evaluates them on demand:
//!
//! ```rust,ignore
//! let expr = Expression::parse("user.first + ' ' + user.last")?;
//! let value = expr.evaluate(&scope)?;
//! ```
//!
//! Reads go through observed data, so evaluating inside a watcher records
//! every property the expression touched. Assignable expressions (`a`,
//! `a.b`, `a[i]`) can also be written through with [`Expression::assign`],
//! which is how two-way bindings push control input back into the model.

mod ast;
mod eval;
mod lexer;
mod parser;
mod scope;

use std::rc::Rc;

pub use scope::{LoopSource, Method, Methods, Scope};

use crate::error::{CompileError, ExprError};
use crate::observer::Data;
use ast::Expr;

/// A parsed expression together with its source text.
#[derive(Clone)]
pub struct Expression {
    source: Rc<str>,
    ast: Rc<Expr>,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let source = source.trim();
        let ast = parser::parse(source)?;
        Ok(Self {
            source: Rc::from(source),
            ast: Rc::new(ast),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, scope: &Scope) -> Result<Data, ExprError> {
        eval::evaluate(&self.ast, scope)
    }

    pub fn is_assignable(&self) -> bool {
        self.ast.is_assignable()
    }

    /// Write `value` to the path this expression names.
    pub fn assign(&self, scope: &Scope, value: Data) -> Result<(), ExprError> {
        if !self.is_assignable() {
            return Err(ExprError::NotAssignable(self.source.to_string()));
        }
        eval::assign(&self.ast, scope, value)
    }

    /// The bare identifier this expression consists of, if any.
    pub fn as_identifier(&self) -> Option<&str> {
        match &*self.ast {
            Expr::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// For an object literal, each key with its own value expression.
    pub fn object_entries(&self) -> Option<Vec<(String, Expression)>> {
        let Expr::Object(entries) = &*self.ast else {
            return None;
        };
        let entries = entries
            .iter()
            .map(|entry| {
                let expression = Expression {
                    source: Rc::from(entry.source.as_str()),
                    ast: Rc::new(entry.value.clone()),
                };
                (entry.key.clone(), expression)
            })
            .collect();
        Some(entries)
    }
}

impl std::fmt::Debug for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Expression").field(&self.source).finish()
    }
}

/// `alias in source` or `(alias, index) in source`.
#[derive(Debug, Clone)]
pub struct LoopSpec {
    pub alias: String,
    pub index_alias: Option<String>,
    pub source: Expression,
}

impl LoopSpec {
    pub fn parse(text: &str) -> Result<Self, CompileError> {
        let invalid = || CompileError::InvalidLoop(text.to_string());

        let (head, source) = text.split_once(" in ").ok_or_else(invalid)?;
        let head = head.trim();
        let head = head
            .strip_prefix('(')
            .and_then(|inner| inner.strip_suffix(')'))
            .unwrap_or(head);

        let mut names = head.split(',').map(str::trim);
        let alias = names.next().filter(|name| is_identifier(name)).ok_or_else(invalid)?;
        let index_alias = match names.next() {
            Some(name) if is_identifier(name) => Some(name.to_string()),
            Some(_) => return Err(invalid()),
            None => None,
        };
        if names.next().is_some() {
            return Err(invalid());
        }

        let source = Expression::parse(source).map_err(|err| CompileError::expression(source.trim(), err))?;
        Ok(Self {
            alias: alias.to_string(),
            index_alias,
            source,
        })
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{Observer, Value};
    use crate::reactive::Runtime;
    use serde_json::json;

    #[test]
    fn parse_errors_carry_the_expression() {
        let err = Expression::parse("a +").unwrap_err();
        let ExprError::Syntax { expression, .. } = err else {
            panic!("expected syntax error");
        };
        assert_eq!(expression, "a +");
    }

    #[test]
    fn object_entries_split_per_key() {
        let expr = Expression::parse("{id: bid, data-id: did}").unwrap();
        let entries = expr.object_entries().unwrap();
        assert_eq!(entries[0].0, "id");
        assert_eq!(entries[1].0, "data-id");
        assert_eq!(entries[1].1.source(), "did");
        assert!(Expression::parse("a").unwrap().object_entries().is_none());
    }

    #[test]
    fn assign_requires_assignable_expression() {
        let model = Observer::new(&Runtime::new())
            .observe_model(Value::from(json!({"a": 1})))
            .unwrap();
        let scope = Scope::root(model.clone(), Rc::new(Methods::new()));

        Expression::parse("a").unwrap().assign(&scope, Data::from(5.0)).unwrap();
        assert_eq!(model.get("a").unwrap().as_number(), Some(5.0));

        let err = Expression::parse("a + 1").unwrap().assign(&scope, Data::Null).unwrap_err();
        assert_eq!(err, ExprError::NotAssignable("a + 1".into()));
    }

    #[test]
    fn loop_specs() {
        let spec = LoopSpec::parse("item in items").unwrap();
        assert_eq!(spec.alias, "item");
        assert_eq!(spec.index_alias, None);
        assert_eq!(spec.source.source(), "items");

        let spec = LoopSpec::parse("(item, i) in user.list").unwrap();
        assert_eq!(spec.index_alias.as_deref(), Some("i"));

        assert!(matches!(LoopSpec::parse("items"), Err(CompileError::InvalidLoop(_))));
        assert!(matches!(LoopSpec::parse("1x in items"), Err(CompileError::InvalidLoop(_))));
    }
}
