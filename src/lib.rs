// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Listener
//!
//! Register handlers per (queue, routing key), call `listen` once, and every
//! message arriving on a bound queue is dispatched to the handler registered
//! for its routing key.
//!
//! ```no_run
//! use amqp_listener::{
//!     amqp::AmqpConnector, config::ListenerConfig, handler::handler_fn, listener::Listener,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), amqp_listener::errors::ListenerError> {
//! let listener = Listener::new(
//!     ListenerConfig::from_env(),
//!     Arc::new(AmqpConnector::default()),
//! );
//!
//! listener.on("orders", "order.created", handler_fn(|message, _fields| async move {
//!     println!("order created: {:?}", message.text());
//!     Ok(())
//! }));
//! listener.on_unhandled(|queue, _message, fields| {
//!     eprintln!("nothing handles {} on {}", fields.routing_key, queue);
//! });
//!
//! listener.listen("orders-exchange").await?;
//! # Ok(())
//! # }
//! ```

mod consumer;
mod dispatcher;
mod otel;

pub mod amqp;
pub mod channel;
pub mod client;
pub mod config;
pub mod errors;
pub mod events;
pub mod exchange;
pub mod handler;
pub mod listener;
pub mod message;
pub mod registry;
