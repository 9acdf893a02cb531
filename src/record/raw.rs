//! Upstream message shape
//!
//! The sample stream delivers newline-delimited JSON envelopes of the form
//! `{"data": {"id": ..., "author_id": ..., "entities": {"hashtags": [...]}}}`.
//! Keep-alive lines are empty, and operational messages carry no `data`.

use serde::Deserialize;

use crate::error::{Error, Result};

/// One tag annotation embedded in an upstream post
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TagAnnotation {
    /// Start offset in the post text
    #[serde(default)]
    pub start: Option<u32>,
    /// End offset in the post text
    #[serde(default)]
    pub end: Option<u32>,
    /// Tag text, without the leading marker
    pub tag: String,
}

impl TagAnnotation {
    /// Create an annotation carrying only the tag text
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            start: None,
            end: None,
            tag: tag.into(),
        }
    }
}

/// Entity annotations of an upstream post
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Entities {
    /// Hashtag annotations (absent when the post has none)
    #[serde(default)]
    pub hashtags: Option<Vec<TagAnnotation>>,
}

/// A decoded upstream post
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawMessage {
    /// Post id
    #[serde(default)]
    pub id: Option<String>,
    /// Author identifier
    #[serde(default)]
    pub author_id: String,
    /// Post text
    #[serde(default)]
    pub text: Option<String>,
    /// Entity annotations
    #[serde(default)]
    pub entities: Option<Entities>,
}

/// Envelope wrapping each line of the stream
#[derive(Debug, Deserialize)]
struct StreamLine {
    #[serde(default)]
    data: Option<RawMessage>,
}

impl RawMessage {
    /// Create a message with the given author and no annotations
    pub fn new(author_id: impl Into<String>) -> Self {
        Self {
            author_id: author_id.into(),
            ..Default::default()
        }
    }

    /// Attach hashtag annotations
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hashtags = tags.into_iter().map(TagAnnotation::new).collect();
        self.entities = Some(Entities {
            hashtags: Some(hashtags),
        });
        self
    }

    /// Parse one line of the upstream stream
    ///
    /// Blank keep-alive lines and envelopes without `data` yield `Ok(None)`.
    pub fn from_stream_line(line: &[u8]) -> Result<Option<RawMessage>> {
        if line.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let envelope: StreamLine =
            serde_json::from_slice(line).map_err(|e| Error::Decode(e.to_string()))?;
        Ok(envelope.data)
    }
}
