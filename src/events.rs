// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Listener Event Channels
//!
//! Three typed notification channels exposed to callers:
//! - `connect`: once, after the first successful connection
//! - `error`: every runtime error forwarded from the broker client
//! - `unhandled`: every message whose routing key has no handler
//!
//! Emission is a synchronous fan-out to each subscriber in subscription order.
//! The subscriber list is copied before calling out, so a subscriber may add
//! further subscribers without deadlocking.

use crate::{
    errors::ListenerError,
    message::{ErrorMetadata, Message, MessageFields},
};
use std::sync::{Arc, PoisonError, RwLock};

pub type ConnectSubscriber = Arc<dyn Fn() + Send + Sync>;
pub type ErrorSubscriber = Arc<dyn Fn(&ListenerError, &ErrorMetadata) + Send + Sync>;
pub type UnhandledSubscriber = Arc<dyn Fn(&str, &Message, &MessageFields) + Send + Sync>;

/// Subscriber lists for the three listener events.
#[derive(Default)]
pub struct ListenerEvents {
    connect: RwLock<Vec<ConnectSubscriber>>,
    error: RwLock<Vec<ErrorSubscriber>>,
    unhandled: RwLock<Vec<UnhandledSubscriber>>,
}

impl ListenerEvents {
    pub fn on_connect<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        push(&self.connect, Arc::new(f));
    }

    pub fn on_error<F>(&self, f: F)
    where
        F: Fn(&ListenerError, &ErrorMetadata) + Send + Sync + 'static,
    {
        push(&self.error, Arc::new(f));
    }

    pub fn on_unhandled<F>(&self, f: F)
    where
        F: Fn(&str, &Message, &MessageFields) + Send + Sync + 'static,
    {
        push(&self.unhandled, Arc::new(f));
    }

    pub(crate) fn emit_connect(&self) {
        for subscriber in snapshot(&self.connect) {
            subscriber();
        }
    }

    pub(crate) fn emit_error(&self, err: &ListenerError, metadata: &ErrorMetadata) {
        for subscriber in snapshot(&self.error) {
            subscriber(err, metadata);
        }
    }

    pub(crate) fn emit_unhandled(&self, queue: &str, message: &Message, fields: &MessageFields) {
        for subscriber in snapshot(&self.unhandled) {
            subscriber(queue, message, fields);
        }
    }
}

fn push<T>(list: &RwLock<Vec<T>>, item: T) {
    list.write()
        .unwrap_or_else(PoisonError::into_inner)
        .push(item);
}

fn snapshot<T: Clone>(list: &RwLock<Vec<T>>) -> Vec<T> {
    list.read().unwrap_or_else(PoisonError::into_inner).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn fans_out_in_subscription_order() {
        let events = ListenerEvents::default();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for id in 0..3 {
            let calls = calls.clone();
            events.on_connect(move || calls.lock().unwrap().push(id));
        }

        events.emit_connect();

        assert_eq!(*calls.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn channels_are_independent() {
        let events = ListenerEvents::default();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let unhandled = Arc::new(Mutex::new(Vec::new()));

        let sink = errors.clone();
        events.on_error(move |err, meta| sink.lock().unwrap().push((err.clone(), meta.clone())));
        let sink = unhandled.clone();
        events.on_unhandled(move |queue, message, fields| {
            sink.lock()
                .unwrap()
                .push((queue.to_owned(), message.clone(), fields.clone()))
        });

        let meta = ErrorMetadata {
            queue: Some("orders".to_owned()),
            ..ErrorMetadata::default()
        };
        events.emit_error(&ListenerError::AckMessageError, &meta);
        events.emit_connect();

        assert_eq!(
            *errors.lock().unwrap(),
            vec![(ListenerError::AckMessageError, meta)]
        );
        assert!(unhandled.lock().unwrap().is_empty());
    }

    #[test]
    fn subscriber_may_subscribe_while_emitting() {
        let events = Arc::new(ListenerEvents::default());
        let calls = Arc::new(Mutex::new(0));

        let inner_events = events.clone();
        let inner_calls = calls.clone();
        events.on_connect(move || {
            let calls = inner_calls.clone();
            inner_events.on_connect(move || *calls.lock().unwrap() += 1);
        });

        events.emit_connect();
        assert_eq!(*calls.lock().unwrap(), 0);

        events.emit_connect();
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
