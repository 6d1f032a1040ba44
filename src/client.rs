// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Broker Client Contract
//!
//! The listener does not talk to the broker itself. It drives a [`BusClient`]
//! obtained from a [`Connector`], both injected at construction time so they
//! can be swapped for the lapin-backed implementation in [`crate::amqp`] or for
//! a test double.

use crate::{
    errors::{HandlerError, ListenerError},
    message::{ErrorMetadata, Message, MessageFields},
};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;

/// Callback the client invokes once per inbound message on a consumed queue.
///
/// The returned future's result is the handler's completion; the client owns
/// the acknowledgement policy applied to it.
pub type ConsumeCallback =
    Arc<dyn Fn(Message, MessageFields) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// Callback the client invokes for every runtime error it observes.
pub type ErrorCallback = Arc<dyn Fn(&ListenerError, &ErrorMetadata) + Send + Sync>;

/// Handle returned by `Listener::listen`: the connected client.
pub type ConnectionHandle = Arc<dyn BusClient>;

/// Operations the listener needs from a connected broker client.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BusClient: Send + Sync {
    /// Ensures `exchange` and `queue` exist and `queue` is bound to `exchange` with `key`.
    async fn setup_queue(&self, exchange: &str, queue: &str, key: &str) -> Result<(), ListenerError>;

    /// Starts delivering messages from `queue` to `callback`.
    async fn consume(&self, queue: &str, callback: ConsumeCallback) -> Result<(), ListenerError>;

    /// Subscribes to runtime errors raised by the client.
    fn on_error(&self, callback: ErrorCallback);
}

/// Opens client connections to a broker URL.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<ConnectionHandle, ListenerError>;
}
