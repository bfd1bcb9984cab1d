use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, Result};
use crate::time_utils::DateNormalizer;

/// Column names of the post table, in storage order.
pub const HEADER: [&str; 4] = [
    "publication_date",
    "channel_name",
    "content",
    "reaction_count",
];

/// Stored in place of the text of a post that carries only media.
pub const NON_TEXT_PLACEHOLDER: &str = "[non-text content]";

// ── Record ────────────────────────────────────────────────────────────────────

/// One logged channel post.
///
/// Construction validates the invariants, so a `Record` that exists always
/// has a canonical date and a non-blank source name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    published_at: String,
    source_name: String,
    content: String,
    reaction_count: u64,
}

impl Record {
    pub fn new(
        published_at: impl Into<String>,
        source_name: impl Into<String>,
        content: impl Into<String>,
        reaction_count: u64,
    ) -> Result<Self> {
        let published_at = published_at.into();
        let source_name = source_name.into();

        if DateNormalizer::parse(&published_at).is_none() {
            return Err(ArchiveError::InvalidRecord(format!(
                "publication date \"{}\" is not in a canonical layout",
                published_at
            )));
        }
        if source_name.trim().is_empty() {
            return Err(ArchiveError::InvalidRecord(
                "source name must not be empty".to_string(),
            ));
        }

        Ok(Self {
            published_at,
            source_name,
            content: content.into(),
            reaction_count,
        })
    }

    pub fn published_at(&self) -> &str {
        &self.published_at
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn reaction_count(&self) -> u64 {
        self.reaction_count
    }

    /// Fields in [`HEADER`] order, ready for the tabular codec.
    pub fn to_fields(&self) -> [String; 4] {
        [
            self.published_at.clone(),
            self.source_name.clone(),
            self.content.clone(),
            self.reaction_count.to_string(),
        ]
    }
}

// ── RawRow ────────────────────────────────────────────────────────────────────

/// A row as read back from the store. The date text is not parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawRow {
    pub date_text: String,
    pub source_name: String,
    pub content: String,
    pub reaction_count: u64,
}

impl RawRow {
    /// Fields in [`HEADER`] order, ready for the tabular codec.
    pub fn to_fields(&self) -> [String; 4] {
        [
            self.date_text.clone(),
            self.source_name.clone(),
            self.content.clone(),
            self.reaction_count.to_string(),
        ]
    }
}

impl From<&Record> for RawRow {
    fn from(record: &Record) -> Self {
        Self {
            date_text: record.published_at.clone(),
            source_name: record.source_name.clone(),
            content: record.content.clone(),
            reaction_count: record.reaction_count,
        }
    }
}

// ── Channel events ────────────────────────────────────────────────────────────

/// An inbound event from the channel listener.
///
/// Only [`ChannelEvent::TopLevelPost`] is ever turned into a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelEvent {
    TopLevelPost(PostEvent),
    Reply {
        #[serde(default)]
        peer_id: Option<i64>,
    },
    Other,
}

/// Payload of a top-level post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostEvent {
    /// Identifier of the chat the post was published in.
    #[serde(default)]
    pub peer_id: Option<i64>,
    /// Whether the peer is a broadcast channel or a group.
    #[serde(default)]
    pub is_group_or_channel: bool,
    /// Publication instant in UTC.
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub reaction_count: Option<u64>,
    /// Chat title when the listener already knows it.
    #[serde(default)]
    pub peer_title: Option<String>,
}
