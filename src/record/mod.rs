//! Record model and message decoding
//!
//! Upstream posts arrive as [`RawMessage`] values. The decoder turns each one
//! into a [`PublishedRecord`] carrying only the author id and the hashtags,
//! which is what the relay pushes to subscribers.
//!
//! ```text
//!   stream line ──► RawMessage::from_stream_line() ──► Option<RawMessage>
//!                                                        │
//!                                                        ▼
//!                                                  decode() ──► Option<PublishedRecord>
//! ```

pub mod decode;
pub mod hashtag;
pub mod raw;

pub use decode::decode;
pub use hashtag::Hashtag;
pub use raw::{Entities, RawMessage, TagAnnotation};

use serde::Serialize;

/// The derived record published to subscribers
///
/// Immutable once built. Hashtags keep upstream order and duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedRecord {
    author_id: String,
    hashtags: Vec<Hashtag>,
}

impl PublishedRecord {
    /// Create a record from an author id and its hashtags
    pub fn new(author_id: impl Into<String>, hashtags: Vec<Hashtag>) -> Self {
        Self {
            author_id: author_id.into(),
            hashtags,
        }
    }

    /// Author identifier of the upstream post
    pub fn author_id(&self) -> &str {
        &self.author_id
    }

    /// Hashtags in upstream order
    pub fn hashtags(&self) -> &[Hashtag] {
        &self.hashtags
    }
}
