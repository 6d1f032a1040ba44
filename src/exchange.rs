// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Exchange Kinds
//!
//! The AMQP client declares the listener's exchange before binding queues to it.
//! This module names the exchange types it can declare.

use serde::Deserialize;

/// Represents the types of exchanges the AMQP client can declare.
///
/// - Direct: exact match of routing keys
/// - Fanout: every bound queue, routing keys ignored
/// - Topic: wildcard pattern matching of routing keys (`*`, `#`)
/// - Headers: header values instead of routing keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    Direct,
    Fanout,
    #[default]
    Topic,
    Headers,
}

impl From<&ExchangeKind> for lapin::ExchangeKind {
    fn from(kind: &ExchangeKind) -> lapin::ExchangeKind {
        match kind {
            ExchangeKind::Direct => lapin::ExchangeKind::Direct,
            ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
            ExchangeKind::Headers => lapin::ExchangeKind::Headers,
            ExchangeKind::Topic => lapin::ExchangeKind::Topic,
        }
    }
}
