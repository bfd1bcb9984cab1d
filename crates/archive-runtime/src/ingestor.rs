//! Channel event ingestion.
//!
//! Turns top-level channel posts into [`Record`]s and appends them to the
//! [`Store`]. Runs as its own tokio task fed by an `mpsc` channel; a failing
//! event is logged and the loop moves on to the next one.

use std::sync::Arc;

use archive_core::error::{ArchiveError, Result};
use archive_core::models::{ChannelEvent, PostEvent, Record, NON_TEXT_PLACEHOLDER};
use archive_core::time_utils::TimezoneHandler;
use archive_data::store::Store;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::peers::PeerDirectory;

// ── Public types ──────────────────────────────────────────────────────────────

/// What happened to one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Stored(Record),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A top-level post from a private chat.
    NotChannelPost,
    Reply,
    Other,
}

/// Counters returned when the ingestion loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub received: u64,
    pub stored: u64,
    pub skipped: u64,
    pub failed: u64,
}

// ── Ingestor ──────────────────────────────────────────────────────────────────

pub struct Ingestor<D> {
    store: Arc<Store>,
    directory: D,
    timezone: TimezoneHandler,
    store_time_of_day: bool,
}

impl<D: PeerDirectory> Ingestor<D> {
    /// # Parameters
    /// - `store`             – shared live store.
    /// - `directory`         – title lookup for posts that arrive without one.
    /// - `timezone`          – reference timezone for stored dates.
    /// - `store_time_of_day` – store `YYYY-MM-DD HH:MM:SS` instead of a bare date.
    pub fn new(
        store: Arc<Store>,
        directory: D,
        timezone: TimezoneHandler,
        store_time_of_day: bool,
    ) -> Self {
        Self {
            store,
            directory,
            timezone,
            store_time_of_day,
        }
    }

    /// Build the record for a top-level post without storing it.
    pub fn extract(&self, post: &PostEvent) -> Result<Record> {
        let peer_id = post.peer_id.ok_or_else(|| ArchiveError::Extraction {
            peer: "unknown".to_string(),
            message: "post carries no peer id".to_string(),
        })?;

        let source_name = match post.peer_title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => self
                .directory
                .resolve_name(peer_id)
                .map_err(|e| extraction(peer_id, e.to_string()))?,
        };
        if source_name.trim().is_empty() {
            return Err(extraction(peer_id, "peer has an empty title".to_string()));
        }

        let content = match post.text.as_deref() {
            Some(text) if !text.trim().is_empty() => text.to_string(),
            _ => NON_TEXT_PLACEHOLDER.to_string(),
        };

        let published_at = if self.store_time_of_day {
            self.timezone.to_reference_datetime(post.published_at)
        } else {
            self.timezone.to_reference_date(post.published_at)
        };

        Record::new(
            published_at,
            source_name,
            content,
            post.reaction_count.unwrap_or(0),
        )
        .map_err(|e| extraction(peer_id, e.to_string()))
    }

    /// Store `event` if it is a top-level channel or group post.
    pub fn handle_event(&self, event: &ChannelEvent) -> Result<IngestOutcome> {
        let post = match event {
            ChannelEvent::TopLevelPost(post) if post.is_group_or_channel => post,
            ChannelEvent::TopLevelPost(_) => {
                return Ok(IngestOutcome::Skipped(SkipReason::NotChannelPost))
            }
            ChannelEvent::Reply { .. } => return Ok(IngestOutcome::Skipped(SkipReason::Reply)),
            ChannelEvent::Other => return Ok(IngestOutcome::Skipped(SkipReason::Other)),
        };

        let record = self.extract(post)?;
        self.store.append(&record)?;
        Ok(IngestOutcome::Stored(record))
    }

    /// Consume events until the sender side closes.
    pub async fn run(self, mut rx: mpsc::Receiver<ChannelEvent>) -> IngestStats {
        let mut stats = IngestStats::default();

        while let Some(event) = rx.recv().await {
            stats.received += 1;
            match self.handle_event(&event) {
                Ok(IngestOutcome::Stored(record)) => {
                    stats.stored += 1;
                    debug!(
                        source = record.source_name(),
                        date = record.published_at(),
                        "archived post"
                    );
                }
                Ok(IngestOutcome::Skipped(reason)) => {
                    stats.skipped += 1;
                    debug!(?reason, "skipped channel event");
                }
                Err(e) => {
                    stats.failed += 1;
                    warn!(peer = %peer_label(&event), error = %e, "failed to archive channel event");
                }
            }
        }

        info!(
            "Ingestion finished: {} received, {} stored, {} skipped, {} failed",
            stats.received, stats.stored, stats.skipped, stats.failed
        );
        stats
    }
}

impl<D: PeerDirectory + 'static> Ingestor<D> {
    /// Run [`Ingestor::run`] in a dedicated tokio task.
    pub fn spawn(self, rx: mpsc::Receiver<ChannelEvent>) -> IngestHandle {
        IngestHandle {
            handle: tokio::spawn(self.run(rx)),
        }
    }
}

// ── IngestHandle ──────────────────────────────────────────────────────────────

/// A handle to the background ingestion task.
pub struct IngestHandle {
    handle: tokio::task::JoinHandle<IngestStats>,
}

impl IngestHandle {
    /// Immediately abort the ingestion loop.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Wait for the loop to drain its channel. `None` if it was aborted.
    pub async fn join(self) -> Option<IngestStats> {
        self.handle.await.ok()
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn extraction(peer_id: i64, message: String) -> ArchiveError {
    ArchiveError::Extraction {
        peer: peer_id.to_string(),
        message,
    }
}

fn peer_label(event: &ChannelEvent) -> String {
    let peer_id = match event {
        ChannelEvent::TopLevelPost(post) => post.peer_id,
        ChannelEvent::Reply { peer_id } => *peer_id,
        ChannelEvent::Other => None,
    };
    peer_id.map_or_else(|| "unknown".to_string(), |id| id.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
