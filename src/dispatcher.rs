// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Per-Queue Message Dispatcher
//!
//! Builds the callback handed to `BusClient::consume` for one queue. Each
//! inbound message is routed by a single lookup of its routing key in the
//! registration table. Misses are not errors: the message completes through a
//! no-op handler and an `unhandled` event is emitted, so a missing handler
//! never blocks the queue.

use crate::{
    client::ConsumeCallback,
    events::ListenerEvents,
    handler::{ConsumerHandler, NoopHandler},
    message::{Message, MessageFields},
    registry::Registry,
};
use futures_util::FutureExt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Creates the consume callback for `queue`.
///
/// The registration table is read on every message, so the callback always
/// sees the current handler for a key.
///
/// # Parameters
/// * `queue` - Queue whose messages this callback receives
/// * `registry` - Shared registration table
/// * `events` - Event channels used to announce unhandled messages
pub(crate) fn consume_callback(
    queue: &str,
    registry: Arc<RwLock<Registry>>,
    events: Arc<ListenerEvents>,
) -> ConsumeCallback {
    let queue = queue.to_owned();

    Arc::new(move |message: Message, fields: MessageFields| {
        let handler = registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .lookup(&queue, &fields.routing_key);

        let handler: Arc<dyn ConsumerHandler> = match handler {
            Some(handler) => {
                debug!(queue = %queue, routing_key = %fields.routing_key, "dispatching message");
                handler
            }
            None => {
                warn!(
                    queue = %queue,
                    routing_key = %fields.routing_key,
                    "no handler registered for routing key"
                );
                events.emit_unhandled(&queue, &message, &fields);
                Arc::new(NoopHandler)
            }
        };

        async move { handler.exec(&message, &fields).await }.boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::HandlerError, handler::handler_fn};
    use std::sync::Mutex;

    type Seen = Arc<Mutex<Vec<(Message, MessageFields)>>>;

    fn recording_handler(seen: Seen) -> Arc<dyn ConsumerHandler> {
        Arc::new(handler_fn(move |message, fields| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push((message, fields));
                Ok(())
            }
        }))
    }

    fn unhandled_sink(events: &ListenerEvents) -> Arc<Mutex<Vec<(String, Message, MessageFields)>>> {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let inner = sink.clone();
        events.on_unhandled(move |queue, message, fields| {
            inner
                .lock()
                .unwrap()
                .push((queue.to_owned(), message.clone(), fields.clone()))
        });
        sink
    }

    #[tokio::test]
    async fn routes_to_registered_handler() {
        let seen = Seen::default();
        let mut registry = Registry::default();
        registry.register("orders", "created", recording_handler(seen.clone()));

        let events = Arc::new(ListenerEvents::default());
        let unhandled = unhandled_sink(&events);
        let callback = consume_callback("orders", Arc::new(RwLock::new(registry)), events);

        let message = Message::new("M");
        let fields = MessageFields {
            routing_key: "created".to_owned(),
            exchange: "ex1".to_owned(),
            delivery_tag: 4,
            redelivered: true,
            consumer_tag: "orders-1".to_owned(),
        };

        assert_eq!(callback(message.clone(), fields.clone()).await, Ok(()));
        assert_eq!(*seen.lock().unwrap(), vec![(message, fields)]);
        assert!(unhandled.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unmatched_key_completes_and_emits_once() {
        let seen = Seen::default();
        let mut registry = Registry::default();
        registry.register("orders", "created", recording_handler(seen.clone()));

        let events = Arc::new(ListenerEvents::default());
        let unhandled = unhandled_sink(&events);
        let callback = consume_callback("orders", Arc::new(RwLock::new(registry)), events);

        let message = Message::new("N");
        let fields = MessageFields::with_routing_key("deleted");

        assert_eq!(callback(message.clone(), fields.clone()).await, Ok(()));
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(
            *unhandled.lock().unwrap(),
            vec![("orders".to_owned(), message, fields)]
        );
    }

    #[tokio::test]
    async fn handler_failure_is_returned_to_the_client() {
        let mut registry = Registry::default();
        registry.register(
            "orders",
            "created",
            Arc::new(handler_fn(|_, _| async {
                Err(HandlerError::Failed("db down".to_owned()))
            })),
        );

        let callback = consume_callback(
            "orders",
            Arc::new(RwLock::new(registry)),
            Arc::new(ListenerEvents::default()),
        );

        let result = callback(Message::default(), MessageFields::with_routing_key("created")).await;
        assert_eq!(result, Err(HandlerError::Failed("db down".to_owned())));
    }

    #[tokio::test]
    async fn only_looks_at_its_own_queue() {
        let seen = Seen::default();
        let mut registry = Registry::default();
        registry.register("users", "created", recording_handler(seen.clone()));

        let events = Arc::new(ListenerEvents::default());
        let unhandled = unhandled_sink(&events);
        let callback = consume_callback("orders", Arc::new(RwLock::new(registry)), events);

        callback(Message::default(), MessageFields::with_routing_key("created"))
            .await
            .unwrap();

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(unhandled.lock().unwrap().len(), 1);
    }
}
