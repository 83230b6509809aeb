//! Sugar Core
//!
//! This crate provides the binding engine of the Sugar MVVM view layer.
//! It implements:
//!
//! - Model observation with per-property dependency tracking
//! - Watchers and computed properties
//! - A template compiler driven by `v-` attribute directives
//! - An in-memory DOM the templates are compiled against
//!
//! Everything runs synchronously on the calling thread: a model write
//! re-evaluates the affected watchers and patches the DOM before it
//! returns.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: dependency registries, watchers, computed properties
//! - `observer`: plain values and their observed counterparts
//! - `expression`: the binding expression language and scopes
//! - `dom`: nodes, markup parsing and events
//! - `compiler`: the compile pass and its configuration
//! - `directives`: the directive set (`text`, `html`, `if`, `for`, ...)
//!
//! # Example
//!
//! ```rust,ignore
//! use sugar_core::{dom, Compiler, CompilerOptions, Value};
//! use serde_json::json;
//!
//! let view = dom::element_from_html(r#"<div><p v-if="show">Hello {{ name }}!</p></div>"#).unwrap();
//! let compiler = Compiler::new(CompilerOptions::new(view, Value::from(json!({
//!     "show": true,
//!     "name": "Sugar",
//! }))))?;
//!
//! let model = compiler.model().unwrap();
//! model.set("name", "World")?;
//! // The view now reads: <div><p>Hello World!</p></div>
//! ```

pub mod compiler;
pub mod directives;
pub mod dom;
pub mod error;
pub mod expression;
pub mod observer;
pub mod reactive;

pub use compiler::{Compiler, CompilerOptions};
pub use dom::Node;
pub use error::{CompileError, ExprError, ModelError};
pub use observer::{ArrayRef, Data, Model, ObjectRef, Observer, Value};
pub use reactive::{ComputedProperty, Dep, Runtime, Watcher};
