// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Delivery Processing
//!
//! Turns one lapin delivery into a `Message`/`MessageFields` pair, runs the
//! consume callback inside a consumer span and settles the delivery: ack when
//! the callback succeeds, nack when it fails.

use crate::{
    client::ConsumeCallback,
    errors::ListenerError,
    message::{Message, MessageFields},
    otel,
};
use lapin::{
    message::Delivery,
    options::{BasicAckOptions, BasicNackOptions},
    protocol::basic::AMQPProperties,
};
use opentelemetry::{
    global::BoxedTracer,
    trace::{Span, Status},
};
use std::borrow::Cow;
use tracing::{debug, error, warn};

/// Processes a single delivery received on `consumer_tag`.
///
/// # Parameters
/// * `tracer` - OpenTelemetry tracer for the consumer span
/// * `delivery` - The delivery to process
/// * `consumer_tag` - Tag of the consumer that received the delivery
/// * `callback` - The queue's consume callback
/// * `requeue` - Whether failed deliveries go back to the queue
///
/// # Returns
/// Ok(()) once the delivery is settled, or the ack/nack error
pub(crate) async fn consume(
    tracer: &BoxedTracer,
    delivery: &Delivery,
    consumer_tag: &str,
    callback: &ConsumeCallback,
    requeue: bool,
) -> Result<(), ListenerError> {
    let fields = MessageFields {
        routing_key: delivery.routing_key.to_string(),
        exchange: delivery.exchange.to_string(),
        delivery_tag: delivery.delivery_tag,
        redelivered: delivery.redelivered,
        consumer_tag: consumer_tag.to_owned(),
    };
    let message = to_message(&delivery.data, &delivery.properties);

    let (_ctx, mut span) = otel::consumer_span(&delivery.properties, tracer, &fields.routing_key);

    debug!(
        "received: {} - exchange: {}",
        fields.routing_key, fields.exchange
    );

    let result = callback(message, fields).await;

    if let Err(err) = result {
        warn!(error = err.to_string(), "error whiling handling msg");
        span.record_error(&err);
        span.set_status(Status::Error {
            description: Cow::from("handler failure"),
        });

        return match delivery
            .nack(BasicNackOptions {
                multiple: false,
                requeue,
            })
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("error whiling nack msg");
                span.record_error(&e);
                Err(ListenerError::NackMessageError)
            }
        };
    }

    debug!("message successfully processed");
    match delivery.ack(BasicAckOptions { multiple: false }).await {
        Err(e) => {
            error!("error whiling ack msg");
            span.record_error(&e);
            span.set_status(Status::Error {
                description: Cow::from("error to ack msg"),
            });
            Err(ListenerError::AckMessageError)
        }
        _ => {
            span.set_status(Status::Ok);
            Ok(())
        }
    }
}

/// Copies the payload and the properties the listener exposes.
pub(crate) fn to_message(data: &[u8], props: &AMQPProperties) -> Message {
    Message {
        payload: data.to_vec(),
        content_type: props.content_type().as_ref().map(|v| v.to_string()),
        message_id: props.message_id().as_ref().map(|v| v.to_string()),
    }
}
