//! Reactive Primitives
//!
//! This module implements the publish/subscribe core that links model
//! mutations to the bindings that display them.
//!
//! # Concepts
//!
//! ## Dependency Registry
//!
//! A [`Dep`] is the subscriber list of one observed property. Reading the
//! property inside a watcher evaluation subscribes the watcher; writing it
//! notifies every subscriber in subscription order.
//!
//! ## Watchers
//!
//! A [`Watcher`] pairs a getter with an update callback. It re-runs the
//! getter when notified and calls back only when the value changed.
//!
//! ## Computed Properties
//!
//! A [`ComputedProperty`] is a memoized accessor backed by a lazy watcher.
//!
//! # Implementation Notes
//!
//! Dependency tracking relies on an evaluation context: the watcher being
//! evaluated is pushed on a stack owned by the compiler's [`Runtime`], and
//! observed getters register that watcher. The stack is restored after
//! every evaluation, nested ones included.

mod computed;
mod context;
mod dep;
mod runtime;
mod subscriber;
mod watcher;

pub use computed::{ComputedGetter, ComputedProperty, ComputedSetter};
pub use context::{ContextGuard, ReactiveContext};
pub use dep::Dep;
pub use runtime::Runtime;
pub use subscriber::{DepId, WatcherId};
pub use watcher::{Callback, Getter, Watcher};
