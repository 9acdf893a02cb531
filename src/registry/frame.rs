//! Push frames
//!
//! A `PushFrame` is the unit broadcast to subscribers: the record plus its
//! wire encoding, built once per publish.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::record::PublishedRecord;

/// Default push channel topic
pub const DEFAULT_TOPIC: &str = "PublishTweet";

/// Wire envelope: `{"target": topic, "arguments": [record]}`
#[derive(Serialize)]
struct Envelope<'a> {
    target: &'a str,
    arguments: [&'a PublishedRecord; 1],
}

/// A frame to be broadcast to subscribers
///
/// Cheap to clone: the record is shared and the payload is reference counted.
#[derive(Debug, Clone)]
pub struct PushFrame {
    /// Channel name the frame is published under
    pub topic: Arc<str>,
    /// The published record
    pub record: Arc<PublishedRecord>,
    /// JSON encoding of the envelope
    pub payload: Bytes,
}

impl PushFrame {
    /// Encode a record under the given topic
    pub fn encode(topic: impl Into<Arc<str>>, record: PublishedRecord) -> Result<Self> {
        let topic = topic.into();
        let envelope = Envelope {
            target: &topic,
            arguments: [&record],
        };
        let payload = serde_json::to_vec(&envelope).map_err(|e| Error::Encode(e.to_string()))?;

        Ok(Self {
            topic,
            record: Arc::new(record),
            payload: Bytes::from(payload),
        })
    }

    /// Payload as UTF-8 text
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}
