//! Message decoder
//!
//! Pure mapping from an upstream message to the published record.

use super::hashtag::Hashtag;
use super::raw::RawMessage;
use super::PublishedRecord;

/// Decode an upstream message into a published record
///
/// An absent message yields `None`: nothing is published for it. Hashtags are
/// taken 1:1 from the message's tag annotations, in order, duplicates kept.
/// A message without annotations yields an empty hashtag list.
pub fn decode(raw: Option<&RawMessage>) -> Option<PublishedRecord> {
    let raw = raw?;

    let hashtags = raw
        .entities
        .as_ref()
        .and_then(|e| e.hashtags.as_ref())
        .map(|tags| tags.iter().map(|t| Hashtag::new(t.tag.as_str())).collect())
        .unwrap_or_default();

    Some(PublishedRecord::new(raw.author_id.clone(), hashtags))
}
