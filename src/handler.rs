// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Message Handlers
//!
//! A handler processes one message and reports completion. Handlers for distinct
//! messages may run concurrently, so implementations must be `Send + Sync` and
//! must not rely on state shared across invocations.

use crate::{
    errors::HandlerError,
    message::{Message, MessageFields},
};
use async_trait::async_trait;
use std::future::Future;

/// Processes messages delivered for a (queue, routing key) registration.
#[async_trait]
pub trait ConsumerHandler: Send + Sync {
    /// Handles a single message.
    ///
    /// The returned result is passed untouched to the broker client, which
    /// decides how to acknowledge the delivery.
    async fn exec(&self, message: &Message, fields: &MessageFields) -> Result<(), HandlerError>;
}

/// Handler backed by an async closure. Built with [`handler_fn`].
pub struct FnHandler<F> {
    f: F,
}

/// Wraps an async closure into a [`ConsumerHandler`].
///
/// # Example
/// ```
/// use amqp_listener::handler::handler_fn;
///
/// let handler = handler_fn(|message, _fields| async move {
///     println!("{} bytes", message.payload.len());
///     Ok(())
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Message, MessageFields) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> ConsumerHandler for FnHandler<F>
where
    F: Fn(Message, MessageFields) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    async fn exec(&self, message: &Message, fields: &MessageFields) -> Result<(), HandlerError> {
        (self.f)(message.clone(), fields.clone()).await
    }
}

/// Stand-in used for routing keys nobody registered: completes immediately.
pub struct NoopHandler;

#[async_trait]
impl ConsumerHandler for NoopHandler {
    async fn exec(&self, _: &Message, _: &MessageFields) -> Result<(), HandlerError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    #[tokio::test]
    async fn fn_handler_receives_message_and_fields() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let handler = handler_fn(move |message: Message, fields: MessageFields| {
            let counter = counter.clone();
            async move {
                assert_eq!(message.payload, b"payload".to_vec());
                assert_eq!(fields.routing_key, "orders.created");
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let result = handler
            .exec(
                &Message::new("payload"),
                &MessageFields::with_routing_key("orders.created"),
            )
            .await;

        assert_eq!(result, Ok(()));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fn_handler_propagates_failure() {
        let handler = handler_fn(|_, _| async { Err(HandlerError::Failed("boom".to_owned())) });

        let result = handler
            .exec(&Message::default(), &MessageFields::default())
            .await;

        assert_eq!(result, Err(HandlerError::Failed("boom".to_owned())));
    }

    #[tokio::test]
    async fn noop_completes_successfully() {
        let result = NoopHandler
            .exec(&Message::default(), &MessageFields::default())
            .await;
        assert_eq!(result, Ok(()));
    }
}
