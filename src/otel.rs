// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # OpenTelemetry Consumer Spans
//!
//! Every delivery handled by the AMQP client runs inside a consumer span whose
//! parent context is read from the message headers.

use lapin::{
    protocol::basic::AMQPProperties,
    types::{AMQPValue, ShortString},
};
use opentelemetry::{
    global::{BoxedSpan, BoxedTracer},
    propagation::Extractor,
    trace::{SpanKind, Tracer},
    Context,
};
use std::{borrow::Cow, collections::BTreeMap};
use tracing::error;

/// Reads trace context entries out of AMQP headers.
pub(crate) struct HeaderExtractor<'a> {
    headers: &'a BTreeMap<ShortString, AMQPValue>,
}

impl<'a> HeaderExtractor<'a> {
    pub(crate) fn new(headers: &'a BTreeMap<ShortString, AMQPValue>) -> Self {
        Self { headers }
    }
}

impl Extractor for HeaderExtractor<'_> {
    /// Only long-string headers can carry trace context.
    fn get(&self, key: &str) -> Option<&str> {
        match self.headers.get(key)? {
            AMQPValue::LongString(value) => std::str::from_utf8(value.as_bytes())
                .map_err(|e| error!("error decoding header value {:?}", e))
                .ok(),
            _ => None,
        }
    }

    fn keys(&self) -> Vec<&str> {
        self.headers.keys().map(|header| header.as_str()).collect()
    }
}

/// Starts a consumer span named `name`, parented on the context found in `props`.
///
/// # Returns
/// The extracted parent context and the started span
pub(crate) fn consumer_span(
    props: &AMQPProperties,
    tracer: &BoxedTracer,
    name: &str,
) -> (Context, BoxedSpan) {
    let empty = BTreeMap::new();
    let headers = props.headers().as_ref().map(|h| h.inner()).unwrap_or(&empty);

    let ctx = opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.extract(&HeaderExtractor::new(headers))
    });

    let span = tracer
        .span_builder(Cow::from(name.to_owned()))
        .with_kind(SpanKind::Consumer)
        .start_with_context(tracer, &ctx);

    (ctx, span)
}
