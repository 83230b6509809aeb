//! Error Types
//!
//! Nothing in the binding core is fatal. Setup errors are returned from
//! [`Compiler::new`](crate::Compiler::new); template and expression errors
//! are logged through `tracing` and the offending node is skipped so the
//! rest of the template still compiles.

use thiserror::Error;

/// Errors raised while parsing or evaluating a binding expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// The expression text could not be parsed.
    #[error("syntax error in `{expression}` at {position}: {message}")]
    Syntax {
        expression: String,
        position: usize,
        message: String,
    },

    /// Evaluation failed, e.g. reading a property of `null`.
    #[error("{0}")]
    Runtime(String),

    /// The left-hand side of an assignment is not a writable path.
    #[error("`{0}` is not assignable")]
    NotAssignable(String),

    /// A call expression named a method that was never registered.
    #[error("unknown method `{0}`")]
    UnknownMethod(String),
}

/// Errors raised by model reads and writes through paths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Write to a computed property that has no setter.
    #[error("computed property `{0}` is read-only")]
    ReadOnly(String),

    /// An intermediate path segment does not exist or is not a container.
    #[error("path `{0}` does not resolve to a value")]
    PathNotFound(String),

    /// An array operation was requested on a non-array value.
    #[error("`{0}` is not an array")]
    NotAnArray(String),

    /// An array write would leave a hole before the written index.
    #[error("index {index} is past the end of an array of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Errors raised while compiling a template.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// The view handed to the compiler is not an element.
    #[error("view must be an element node")]
    InvalidView,

    /// The model handed to the compiler is not an object.
    #[error("model must be an object, got {0}")]
    InvalidModel(&'static str),

    /// The directive name is not one the registry knows about.
    #[error("[{0}] is an unknown directive")]
    UnknownDirective(String),

    /// `{{{ html }}}` shares its text node with literal text.
    #[error("[{0}] compile for HTML can not have a prefix or suffix")]
    MixedHtmlInterpolation(String),

    /// A directive that needs an argument (`v-on:click`) was given none.
    #[error("[{0}] requires an argument")]
    MissingArgument(String),

    /// A `for` expression is not of the form `alias in expression`.
    #[error("invalid loop expression `{0}`")]
    InvalidLoop(String),

    /// A `custom` directive names an update function that was not supplied.
    #[error("custom directive `{0}` has no update function")]
    UnknownCustom(String),

    /// The directive expression failed to parse.
    #[error("invalid expression `{expression}`")]
    Expression {
        expression: String,
        #[source]
        source: ExprError,
    },
}

impl CompileError {
    pub(crate) fn expression(expression: &str, source: ExprError) -> Self {
        Self::Expression {
            expression: expression.to_string(),
            source,
        }
    }
}
