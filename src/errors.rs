// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types for the Listener
//!
//! `ListenerError` covers everything that can fail while connecting, setting up
//! queues and consuming from the broker. `HandlerError` is what a message handler
//! reports back when it cannot process a delivery.

use thiserror::Error;

/// Represents errors raised by the broker client collaborator.
///
/// These surface either from `Listener::listen` (connect and setup failures) or
/// asynchronously through the `on_error` event channel (runtime failures).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListenerError {
    /// Error establishing a connection to the broker
    #[error("failure to connect: {0}")]
    ConnectionError(String),

    /// Error creating a channel from an established connection
    #[error("failure to create a channel: {0}")]
    ChannelError(String),

    /// Error declaring an exchange with the given name
    #[error("failure to declare an exchange `{0}`")]
    DeclareExchangeError(String),

    /// Error declaring a queue with the given name
    #[error("failure to declare a queue `{0}`")]
    DeclareQueueError(String),

    /// Error binding a queue to an exchange
    #[error("failure to bind queue `{1}` to exchange `{0}` with key `{2}`")]
    BindingExchangeToQueueError(String, String, String),

    /// Error configuring Quality of Service parameters
    #[error("failure to configure qos `{0}`")]
    QoSDeclarationError(String),

    /// Error registering a consumer on a queue
    #[error("failure to declare consumer `{0}`")]
    BindingConsumerError(String),

    /// Error reported by a running consumer
    #[error("failure to consume message `{0}`")]
    ConsumerError(String),

    /// Error acknowledging a message
    #[error("failure to ack message")]
    AckMessageError,

    /// Error negative-acknowledging a message
    #[error("failure to nack message")]
    NackMessageError,
}

/// Failure reported by a message handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The payload could not be decoded
    #[error("failure to parse payload: {0}")]
    ParsePayload(String),

    /// The handler could not process the message
    #[error("{0}")]
    Failed(String),
}
