// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Handler Registration Table
//!
//! Maps queue name to routing key to handler. Queue names are also kept in a
//! separate list in first-seen order so setup always runs in registration order.

use crate::handler::ConsumerHandler;
use std::{collections::HashMap, sync::Arc};

/// Registration table of (queue, routing key) to handler.
///
/// A queue appears in the ordered list iff it has at least one handler.
#[derive(Default, Clone)]
pub struct Registry {
    order: Vec<String>,
    handlers: HashMap<String, HashMap<String, Arc<dyn ConsumerHandler>>>,
}

impl Registry {
    /// Registers `handler` for (`queue`, `key`). A second registration of the
    /// same pair replaces the first.
    pub fn register(&mut self, queue: &str, key: &str, handler: Arc<dyn ConsumerHandler>) {
        let keys = self.handlers.entry(queue.to_owned()).or_insert_with(|| {
            self.order.push(queue.to_owned());
            HashMap::default()
        });

        keys.insert(key.to_owned(), handler);
    }

    /// Queue names in registration order.
    pub fn queues(&self) -> &[String] {
        &self.order
    }

    /// Routing keys registered on `queue`, sorted.
    pub fn keys(&self, queue: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .handlers
            .get(queue)
            .map(|keys| keys.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Handler registered for (`queue`, `key`), if any.
    pub fn lookup(&self, queue: &str, key: &str) -> Option<Arc<dyn ConsumerHandler>> {
        self.handlers.get(queue)?.get(key).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::NoopHandler;

    fn noop() -> Arc<dyn ConsumerHandler> {
        Arc::new(NoopHandler)
    }

    #[test]
    fn keeps_first_seen_queue_order() {
        let mut registry = Registry::default();
        registry.register("q2", "a", noop());
        registry.register("q1", "a", noop());
        registry.register("q2", "b", noop());
        registry.register("q3", "a", noop());

        assert_eq!(registry.queues(), ["q2", "q1", "q3"]);
    }

    #[test]
    fn last_registration_wins() {
        let first = noop();
        let second = noop();

        let mut registry = Registry::default();
        registry.register("orders", "created", first.clone());
        registry.register("orders", "created", second.clone());

        let found = registry.lookup("orders", "created").unwrap();
        assert!(Arc::ptr_eq(&found, &second));
        assert!(!Arc::ptr_eq(&found, &first));
        assert_eq!(registry.queues(), ["orders"]);
        assert_eq!(registry.keys("orders"), ["created"]);
    }

    #[test]
    fn lookup_misses_unknown_queue_or_key() {
        let mut registry = Registry::default();
        registry.register("orders", "created", noop());

        assert!(registry.lookup("orders", "deleted").is_none());
        assert!(registry.lookup("users", "created").is_none());
        assert!(registry.keys("users").is_empty());
    }

    #[test]
    fn keys_are_sorted() {
        let mut registry = Registry::default();
        registry.register("orders", "updated", noop());
        registry.register("orders", "created", noop());
        registry.register("orders", "orders.#", noop());

        assert_eq!(registry.keys("orders"), ["created", "orders.#", "updated"]);
    }
}
