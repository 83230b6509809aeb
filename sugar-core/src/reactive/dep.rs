//! Dependency Registry
//!
//! Every observed property (and every observed object or array as a whole)
//! owns one [`Dep`]. Reading the property inside a watcher evaluation
//! subscribes that watcher; writing the property calls [`Dep::notify`].
//!
//! # Ordering
//!
//! Subscribers are kept in an [`IndexMap`], so they are unique per watcher
//! and notified in subscription order. `notify` iterates a snapshot: a
//! watcher torn down by an earlier callback in the same pass stays in the
//! snapshot but ignores the call because it is no longer active.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::subscriber::{DepId, WatcherId};
use super::watcher::Watcher;

/// Subscriber list for one reactive property.
pub struct Dep {
    id: DepId,
    subscribers: RefCell<IndexMap<WatcherId, Weak<Watcher>>>,
}

impl Dep {
    /// Create an empty registry.
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            id: DepId::new(),
            subscribers: RefCell::new(IndexMap::new()),
        })
    }

    /// Get the registry's unique ID.
    pub fn id(&self) -> DepId {
        self.id
    }

    /// Add a watcher. Subscribing twice keeps the original position.
    pub fn subscribe(&self, id: WatcherId, watcher: Weak<Watcher>) {
        self.subscribers.borrow_mut().entry(id).or_insert(watcher);
    }

    /// Remove a watcher.
    pub fn unsubscribe(&self, id: WatcherId) {
        self.subscribers.borrow_mut().shift_remove(&id);
    }

    /// Re-run every subscribed watcher, in subscription order.
    pub fn notify(&self) {
        let snapshot: Vec<Weak<Watcher>> = self.subscribers.borrow().values().cloned().collect();

        tracing::trace!(dep = ?self.id, subscribers = snapshot.len(), "notify");

        for weak in snapshot {
            if let Some(watcher) = weak.upgrade() {
                watcher.update();
            }
        }
    }

    /// Whether the given watcher is currently subscribed.
    pub fn has_subscriber(&self, id: WatcherId) -> bool {
        self.subscribers.borrow().contains_key(&id)
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

impl std::fmt::Debug for Dep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.id)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
