// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Inbound Message Types
//!
//! The listener never looks inside a payload. `Message` carries the raw bytes
//! plus a couple of broker properties, and `MessageFields` carries the delivery
//! envelope, most importantly the routing key used for dispatch.

use crate::errors::HandlerError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// A message delivered by the broker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub payload: Vec<u8>,
    pub content_type: Option<String>,
    pub message_id: Option<String>,
}

impl Message {
    /// Creates a message holding only a payload.
    pub fn new(payload: impl Into<Vec<u8>>) -> Message {
        Message {
            payload: payload.into(),
            ..Message::default()
        }
    }

    /// Decodes the payload as JSON.
    ///
    /// # Returns
    /// The decoded value or `HandlerError::ParsePayload`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        serde_json::from_slice(&self.payload).map_err(|e| HandlerError::ParsePayload(e.to_string()))
    }

    /// Reads the payload as UTF-8 text.
    pub fn text(&self) -> Result<&str, HandlerError> {
        std::str::from_utf8(&self.payload).map_err(|e| HandlerError::ParsePayload(e.to_string()))
    }
}

/// Delivery envelope accompanying every message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFields {
    pub routing_key: String,
    pub exchange: String,
    pub delivery_tag: u64,
    pub redelivered: bool,
    pub consumer_tag: String,
}

impl MessageFields {
    /// Creates fields with only the routing key set.
    pub fn with_routing_key(key: &str) -> MessageFields {
        MessageFields {
            routing_key: key.to_owned(),
            ..MessageFields::default()
        }
    }
}

/// Context attached to errors reported by the broker client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorMetadata {
    pub queue: Option<String>,
    pub routing_key: Option<String>,
    pub delivery_tag: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct OrderCreated {
        id: u32,
    }

    #[test]
    fn json_decodes_payload() {
        let msg = Message::new(r#"{"id": 7}"#);
        assert_eq!(msg.json::<OrderCreated>(), Ok(OrderCreated { id: 7 }));
    }

    #[test]
    fn json_reports_parse_errors() {
        let msg = Message::new("not json");
        assert!(matches!(
            msg.json::<OrderCreated>(),
            Err(HandlerError::ParsePayload(_))
        ));
    }

    #[test]
    fn text_rejects_invalid_utf8() {
        assert_eq!(Message::new("hello").text(), Ok("hello"));
        assert!(Message::new(vec![0xff, 0xfe]).text().is_err());
    }
}
