//! Tokenizer for binding expressions, generated by Logos.

use logos::{Lexer, Logos};

use crate::error::ExprError;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub(crate) enum Token {
    // === Literals ===
    /// Digits, plus a fraction only when a digit follows the dot, so
    /// `items.0.name` stays a path.
    #[regex(r"[0-9]+", number)]
    Number(f64),

    #[regex(r#"'([^'\\]|\\.)*'"#, string)]
    #[regex(r#""([^"\\]|\\.)*""#, string)]
    String(String),

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice().to_string())]
    Ident(String),

    // === Punctuation ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,

    // === Operators ===
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("=")]
    Assign,

    // === Comparison ===
    #[token("==")]
    Eq,
    #[token("!=")]
    NotEq,
    #[token("===")]
    StrictEq,
    #[token("!==")]
    StrictNotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,

    // === Logical ===
    #[token("&&")]
    And,
    #[token("||")]
    Or,

    /// Appended by [`tokenize`]; never produced by the generated lexer.
    Eof,
}

fn number(lex: &mut Lexer<'_, Token>) -> Option<f64> {
    if let Some(fraction) = lex.remainder().strip_prefix('.') {
        let digits = fraction.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 {
            lex.bump(digits + 1);
        }
    }
    lex.slice().parse().ok()
}

fn string(lex: &mut Lexer<'_, Token>) -> String {
    let slice = lex.slice();
    let mut text = String::with_capacity(slice.len());
    let mut escaped = false;
    for c in slice[1..slice.len() - 1].chars() {
        if escaped {
            text.push(match c {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                other => other,
            });
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            text.push(c);
        }
    }
    text
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub position: usize,
}

/// Tokenize the whole input. The last token is always [`Token::Eof`].
pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, ExprError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let position = lexer.span().start;
        match result {
            Ok(token) => tokens.push(Spanned { token, position }),
            Err(()) => {
                let message = match lexer.slice().chars().next() {
                    Some('\'' | '"') => "unterminated string".to_string(),
                    Some(other) => format!("unexpected character `{other}`"),
                    None => "unexpected end of input".to_string(),
                };
                return Err(ExprError::Syntax {
                    expression: source.to_string(),
                    position,
                    message,
                });
            }
        }
    }

    tokens.push(Spanned {
        token: Token::Eof,
        position: source.len(),
    });
    Ok(tokens)
}
