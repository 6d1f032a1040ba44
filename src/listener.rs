// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Bus Listener
//!
//! The listener owns the handler registration table, connects once to the
//! broker through an injected [`Connector`], binds every registered
//! (queue, routing key) pair on an exchange and attaches one dispatcher per
//! queue.
//!
//! `listen` runs its setup as an ordered pipeline of steps. For each queue, in
//! registration order, every key is bound first and the queue's consumer is
//! registered last, before anything happens for the next queue. The first
//! failing step aborts the pipeline and its error is returned unmodified.
//!
//! Queues whose consumer was registered are remembered. A `listen` that failed
//! halfway can be called again: it keeps the existing connection and only runs
//! the steps of queues that are not complete yet.

use crate::{
    client::{ConnectionHandle, Connector},
    config::ListenerConfig,
    dispatcher::consume_callback,
    errors::ListenerError,
    events::ListenerEvents,
    handler::ConsumerHandler,
    message::{ErrorMetadata, Message, MessageFields},
    registry::Registry,
};
use std::{
    collections::HashSet,
    sync::{Arc, PoisonError, RwLock},
};
use tokio::sync::Mutex;
use tracing::{debug, error};

/// One step of the setup pipeline run by [`Listener::listen`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupStep {
    /// Ensure `queue` is bound to the exchange with `key`
    Bind { queue: String, key: String },
    /// Register the dispatcher for `queue`
    Consume { queue: String },
}

#[derive(Default)]
struct ConnectionState {
    client: Option<ConnectionHandle>,
    ready: HashSet<String>,
}

/// Registers handlers per (queue, routing key) and dispatches broker messages to them.
pub struct Listener {
    config: ListenerConfig,
    connector: Arc<dyn Connector>,
    registry: Arc<RwLock<Registry>>,
    events: Arc<ListenerEvents>,
    state: Mutex<ConnectionState>,
}

impl Listener {
    /// Creates a listener for the broker at `config.url`.
    ///
    /// # Parameters
    /// * `config` - Broker URL
    /// * `connector` - Opens the client connection on the first `listen`
    pub fn new(config: ListenerConfig, connector: Arc<dyn Connector>) -> Listener {
        Listener {
            config,
            connector,
            registry: Arc::new(RwLock::new(Registry::default())),
            events: Arc::new(ListenerEvents::default()),
            state: Mutex::new(ConnectionState::default()),
        }
    }

    /// Registers `handler` for messages arriving on `queue` with routing key `key`.
    ///
    /// Registering the same pair again replaces the previous handler. Handlers
    /// should not be replaced once `listen` has started consuming.
    pub fn on<H>(&self, queue: &str, key: &str, handler: H)
    where
        H: ConsumerHandler + 'static,
    {
        self.register(queue, key, Arc::new(handler));
    }

    /// Same as [`Listener::on`] for an already shared handler.
    pub fn register(&self, queue: &str, key: &str, handler: Arc<dyn ConsumerHandler>) {
        debug!(queue = queue, key = key, "registering handler");
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(queue, key, handler);
    }

    /// Subscribes to the `connect` event, emitted once after the first successful connection.
    pub fn on_connect<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.events.on_connect(f);
    }

    /// Subscribes to errors forwarded from the broker client.
    pub fn on_error<F>(&self, f: F)
    where
        F: Fn(&ListenerError, &ErrorMetadata) + Send + Sync + 'static,
    {
        self.events.on_error(f);
    }

    /// Subscribes to messages whose routing key has no registered handler.
    pub fn on_unhandled<F>(&self, f: F)
    where
        F: Fn(&str, &Message, &MessageFields) + Send + Sync + 'static,
    {
        self.events.on_unhandled(f);
    }

    /// Queue names in registration order.
    pub fn queues(&self) -> Vec<String> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .queues()
            .to_vec()
    }

    /// Returns true once a client connection has been established.
    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.client.is_some()
    }

    /// Connects to the broker, binds every registered pair on `exchange` and starts consuming.
    ///
    /// Calling `listen` on a listener that is already connected and fully set
    /// up returns the existing handle without any further broker call.
    ///
    /// # Parameters
    /// * `exchange` - Exchange every queue is bound to
    ///
    /// # Returns
    /// The connection handle, or the first error reported by the client
    pub async fn listen(&self, exchange: &str) -> Result<ConnectionHandle, ListenerError> {
        let mut state = self.state.lock().await;

        let client = match state.client.clone() {
            Some(client) => client,
            None => {
                let client = self.connect().await?;
                state.client = Some(client.clone());
                client
            }
        };

        let steps = self.plan(&state.ready);
        if steps.is_empty() {
            return Ok(client);
        }

        for step in steps {
            match step {
                SetupStep::Bind { queue, key } => {
                    debug!(exchange = exchange, queue = %queue, key = %key, "binding queue");
                    client.setup_queue(exchange, &queue, &key).await?;
                }
                SetupStep::Consume { queue } => {
                    let callback =
                        consume_callback(&queue, self.registry.clone(), self.events.clone());
                    client.consume(&queue, callback).await?;
                    debug!(queue = %queue, "consuming queue");
                    state.ready.insert(queue);
                }
            }
        }

        Ok(client)
    }

    /// Setup steps the next `listen` would run.
    pub async fn pending_steps(&self) -> Vec<SetupStep> {
        let state = self.state.lock().await;
        self.plan(&state.ready)
    }

    fn plan(&self, ready: &HashSet<String>) -> Vec<SetupStep> {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);

        let mut steps = vec![];
        for queue in registry.queues().iter().filter(|q| !ready.contains(*q)) {
            for key in registry.keys(queue) {
                steps.push(SetupStep::Bind {
                    queue: queue.clone(),
                    key,
                });
            }
            steps.push(SetupStep::Consume {
                queue: queue.clone(),
            });
        }

        steps
    }

    async fn connect(&self) -> Result<ConnectionHandle, ListenerError> {
        debug!("connecting listener...");
        let client = self.connector.connect(&self.config.url).await?;
        debug!("listener connected");

        self.events.emit_connect();

        let events = self.events.clone();
        client.on_error(Arc::new(move |err: &ListenerError, metadata: &ErrorMetadata| {
            error!(error = err.to_string(), "broker client error");
            events.emit_error(err, metadata);
        }));

        Ok(client)
    }
}
