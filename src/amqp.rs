// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Lapin Broker Client
//!
//! Default [`Connector`]/[`BusClient`] pair backed by lapin.
//!
//! - `setup_queue` declares the exchange and the queue, then binds them with the key
//! - `consume` registers a consumer and spawns a task that feeds every delivery
//!   to the listener's callback, acking or nacking on its result
//!
//! Runtime failures (connection errors, broken consumer streams, failed
//! ack/nack) never stop consumption; they are reported to the `on_error`
//! subscribers together with the queue and delivery they concern.

use crate::{
    channel::new_amqp_channel,
    client::{BusClient, ConnectionHandle, ConsumeCallback, Connector, ErrorCallback},
    config::AmqpConfig,
    consumer::consume,
    errors::ListenerError,
    message::ErrorMetadata,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::{
    options::{
        BasicConsumeOptions, BasicQosOptions, ExchangeDeclareOptions, QueueBindOptions,
        QueueDeclareOptions,
    },
    types::FieldTable,
    Channel, Connection,
};
use opentelemetry::global;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error};
use uuid::Uuid;

type ErrorSubscribers = Arc<RwLock<Vec<ErrorCallback>>>;

/// Opens lapin connections for the listener.
#[derive(Debug, Clone, Default)]
pub struct AmqpConnector {
    config: AmqpConfig,
}

impl AmqpConnector {
    pub fn new(config: AmqpConfig) -> AmqpConnector {
        AmqpConnector { config }
    }
}

#[async_trait]
impl Connector for AmqpConnector {
    async fn connect(&self, url: &str) -> Result<ConnectionHandle, ListenerError> {
        let (connection, channel) = new_amqp_channel(url, &self.config.connection_name).await?;

        if let Some(prefetch) = self.config.prefetch {
            match channel
                .basic_qos(prefetch, BasicQosOptions::default())
                .await
            {
                Err(err) => {
                    error!(error = err.to_string(), "failure to configure qos");
                    Err(ListenerError::QoSDeclarationError(err.to_string()))
                }
                _ => Ok(()),
            }?;
        }

        let client: ConnectionHandle =
            Arc::new(AmqpClient::new(connection, channel, self.config.clone()));
        Ok(client)
    }
}

/// Broker client working on a single lapin channel.
pub struct AmqpClient {
    connection: Arc<Connection>,
    channel: Arc<Channel>,
    config: AmqpConfig,
    error_subscribers: ErrorSubscribers,
}

impl AmqpClient {
    /// Wraps an open connection and channel.
    ///
    /// Connection-level errors reported by lapin are forwarded to the
    /// `on_error` subscribers with empty metadata.
    pub fn new(connection: Arc<Connection>, channel: Arc<Channel>, config: AmqpConfig) -> AmqpClient {
        let error_subscribers = ErrorSubscribers::default();

        let subscribers = error_subscribers.clone();
        connection.on_error(move |err| {
            error!(error = err.to_string(), "amqp connection error");
            notify(
                &subscribers,
                &ListenerError::ConnectionError(err.to_string()),
                &ErrorMetadata::default(),
            );
        });

        AmqpClient {
            connection,
            channel,
            config,
            error_subscribers,
        }
    }

    /// The underlying lapin connection.
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }
}

#[async_trait]
impl BusClient for AmqpClient {
    async fn setup_queue(&self, exchange: &str, queue: &str, key: &str) -> Result<(), ListenerError> {
        debug!("creating exchange: {}", exchange);
        match self
            .channel
            .exchange_declare(
                exchange,
                (&self.config.exchange_kind).into(),
                ExchangeDeclareOptions {
                    durable: self.config.durable,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
        {
            Err(err) => {
                error!(
                    error = err.to_string(),
                    name = exchange,
                    "error to declare the exchange"
                );
                Err(ListenerError::DeclareExchangeError(exchange.to_owned()))
            }
            _ => Ok(()),
        }?;

        debug!("creating queue: {}", queue);
        match self
            .channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: self.config.durable,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
        {
            Err(err) => {
                error!(error = err.to_string(), name = queue, "error to declare the queue");
                Err(ListenerError::DeclareQueueError(queue.to_owned()))
            }
            _ => Ok(()),
        }?;

        debug!(
            "binding queue: {} to the exchange: {} with the key: {}",
            queue, exchange, key
        );
        match self
            .channel
            .queue_bind(
                queue,
                exchange,
                key,
                QueueBindOptions { nowait: false },
                FieldTable::default(),
            )
            .await
        {
            Err(err) => {
                error!(error = err.to_string(), "error to bind queue to exchange");
                Err(ListenerError::BindingExchangeToQueueError(
                    exchange.to_owned(),
                    queue.to_owned(),
                    key.to_owned(),
                ))
            }
            _ => Ok(()),
        }
    }

    async fn consume(&self, queue: &str, callback: ConsumeCallback) -> Result<(), ListenerError> {
        let consumer_tag = format!("{}-{}", queue, Uuid::new_v4());

        let mut consumer = match self
            .channel
            .basic_consume(
                queue,
                &consumer_tag,
                BasicConsumeOptions {
                    no_local: false,
                    no_ack: false,
                    exclusive: false,
                    nowait: false,
                },
                FieldTable::default(),
            )
            .await
        {
            Err(err) => {
                error!(error = err.to_string(), "error to create the consumer");
                Err(ListenerError::BindingConsumerError(queue.to_owned()))
            }
            Ok(c) => Ok(c),
        }?;

        let queue = queue.to_owned();
        let requeue = self.config.requeue_on_failure;
        let subscribers = self.error_subscribers.clone();

        tokio::spawn(async move {
            let tracer = global::tracer("amqp consumer");

            while let Some(result) = consumer.next().await {
                match result {
                    Ok(delivery) => {
                        if let Err(err) =
                            consume(&tracer, &delivery, &consumer_tag, &callback, requeue).await
                        {
                            error!(error = err.to_string(), "error consume msg");
                            let metadata = ErrorMetadata {
                                queue: Some(queue.clone()),
                                routing_key: Some(delivery.routing_key.to_string()),
                                delivery_tag: Some(delivery.delivery_tag),
                            };
                            notify(&subscribers, &err, &metadata);
                        }
                    }

                    Err(err) => {
                        error!(error = err.to_string(), "errors consume msg");
                        let metadata = ErrorMetadata {
                            queue: Some(queue.clone()),
                            ..ErrorMetadata::default()
                        };
                        notify(
                            &subscribers,
                            &ListenerError::ConsumerError(err.to_string()),
                            &metadata,
                        );
                    }
                }
            }

            debug!(queue = %queue, "consumer stream closed");
        });

        Ok(())
    }

    fn on_error(&self, callback: ErrorCallback) {
        self.error_subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }
}

fn notify(subscribers: &ErrorSubscribers, err: &ListenerError, metadata: &ErrorMetadata) {
    let subscribers = subscribers
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();

    for subscriber in subscribers {
        subscriber(err, metadata);
    }
}
