//! Recursive descent parser for binding expressions.
//!
//! Precedence, loosest first: assignment, conditional, `||`, `&&`,
//! equality, relational, additive, multiplicative, unary, postfix.

use super::ast::{BinaryOp, Expr, ObjectEntry, UnaryOp};
use super::lexer::{tokenize, Spanned, Token};
use crate::error::ExprError;
use crate::observer::Value;

pub(crate) fn parse(source: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };

    if parser.peek() == &Token::Eof {
        return Err(parser.error("empty expression"));
    }

    let expr = parser.assignment()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        other => {
            let message = format!("unexpected {other:?}");
            Err(parser.error(message))
        }
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map(|spanned| &spanned.token)
            .unwrap_or(&Token::Eof)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .map(|spanned| &spanned.token)
            .unwrap_or(&Token::Eof)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.source.len(), |spanned| spanned.position)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), ExprError> {
        if self.eat(token) {
            Ok(())
        } else {
            let message = format!("expected {token:?}, found {:?}", self.peek());
            Err(self.error(message))
        }
    }

    fn error(&self, message: impl Into<String>) -> ExprError {
        ExprError::Syntax {
            expression: self.source.to_string(),
            position: self.position(),
            message: message.into(),
        }
    }

    fn assignment(&mut self) -> Result<Expr, ExprError> {
        let target = self.conditional()?;
        if self.peek() != &Token::Assign {
            return Ok(target);
        }
        if !target.is_assignable() {
            return Err(self.error("invalid assignment target"));
        }
        self.advance();
        let value = self.assignment()?;
        Ok(Expr::Assign(Box::new(target), Box::new(value)))
    }

    fn conditional(&mut self) -> Result<Expr, ExprError> {
        let test = self.binary(0)?;
        if !self.eat(&Token::Question) {
            return Ok(test);
        }
        let consequent = self.assignment()?;
        self.expect(&Token::Colon)?;
        let alternate = self.assignment()?;
        Ok(Expr::Conditional(
            Box::new(test),
            Box::new(consequent),
            Box::new(alternate),
        ))
    }

    /// Precedence climbing over the binary operator levels.
    fn binary(&mut self, min_level: u8) -> Result<Expr, ExprError> {
        let mut left = self.unary()?;
        while let Some((op, level)) = binary_op(self.peek()) {
            if level < min_level {
                break;
            }
            self.advance();
            let right = self.binary(level + 1)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        let op = match self.peek() {
            Token::Bang => UnaryOp::Not,
            Token::Minus => UnaryOp::Negate,
            Token::Plus => UnaryOp::Plus,
            _ => return self.postfix(),
        };
        self.advance();
        let operand = self.unary()?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    match self.advance() {
                        Token::Ident(name) => expr = Expr::Member(Box::new(expr), name),
                        Token::Number(n) if n.fract() == 0.0 => {
                            expr = Expr::Index(Box::new(expr), Box::new(Expr::Literal(Value::Number(n))))
                        }
                        _ => return Err(self.error("expected property name after `.`")),
                    }
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.assignment()?;
                    self.expect(&Token::RBracket)?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                Token::LParen => {
                    let Expr::Ident(name) = expr else {
                        return Err(self.error("only named methods can be called"));
                    };
                    self.advance();
                    let args = self.list(&Token::RParen)?;
                    expr = Expr::Call(name, args);
                }
                _ => return Ok(expr),
            }
        }
    }

    fn list(&mut self, close: &Token) -> Result<Vec<Expr>, ExprError> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.assignment()?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(&Token::Comma)?;
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let position = self.position();
        let expr = match self.advance() {
            Token::Number(n) => Expr::Literal(Value::Number(n)),
            Token::String(s) => Expr::Literal(Value::String(s)),
            Token::Ident(name) => match name.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" | "undefined" => Expr::Literal(Value::Null),
                _ => Expr::Ident(name),
            },
            Token::LParen => {
                let inner = self.assignment()?;
                self.expect(&Token::RParen)?;
                inner
            }
            Token::LBracket => Expr::Array(self.list(&Token::RBracket)?),
            Token::LBrace => self.object()?,
            other => {
                return Err(ExprError::Syntax {
                    expression: self.source.to_string(),
                    position,
                    message: format!("unexpected {other:?}"),
                });
            }
        };
        Ok(expr)
    }

    /// Object literal after the opening brace. Keys may be dashed names
    /// such as `data-id`.
    fn object(&mut self) -> Result<Expr, ExprError> {
        let mut entries = Vec::new();
        if self.eat(&Token::RBrace) {
            return Ok(Expr::Object(entries));
        }

        loop {
            let key = match self.advance() {
                Token::Ident(first) => {
                    let mut key = first;
                    while self.peek() == &Token::Minus {
                        let Token::Ident(part) = self.peek_at(1).clone() else {
                            break;
                        };
                        self.pos += 2;
                        key.push('-');
                        key.push_str(&part);
                    }
                    key
                }
                Token::String(key) => key,
                _ => return Err(self.error("expected object key")),
            };
            self.expect(&Token::Colon)?;

            let start = self.position();
            let value = self.assignment()?;
            let end = self.position();
            let source = self.source[start..end].trim().to_string();
            entries.push(ObjectEntry { key, value, source });

            if self.eat(&Token::RBrace) {
                return Ok(Expr::Object(entries));
            }
            self.expect(&Token::Comma)?;
            if self.eat(&Token::RBrace) {
                return Ok(Expr::Object(entries));
            }
        }
    }
}

fn binary_op(token: &Token) -> Option<(BinaryOp, u8)> {
    let op = match token {
        Token::Or => (BinaryOp::Or, 0),
        Token::And => (BinaryOp::And, 1),
        Token::Eq => (BinaryOp::Eq, 2),
        Token::NotEq => (BinaryOp::NotEq, 2),
        Token::StrictEq => (BinaryOp::StrictEq, 2),
        Token::StrictNotEq => (BinaryOp::StrictNotEq, 2),
        Token::Lt => (BinaryOp::Lt, 3),
        Token::LtEq => (BinaryOp::LtEq, 3),
        Token::Gt => (BinaryOp::Gt, 3),
        Token::GtEq => (BinaryOp::GtEq, 3),
        Token::Plus => (BinaryOp::Add, 4),
        Token::Minus => (BinaryOp::Sub, 4),
        Token::Star => (BinaryOp::Mul, 5),
        Token::Slash => (BinaryOp::Div, 5),
        Token::Percent => (BinaryOp::Rem, 5),
        _ => return None,
    };
    Some(op)
}
