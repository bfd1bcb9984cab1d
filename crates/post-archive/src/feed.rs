//! JSON-lines channel event feed.
//!
//! Each non-empty line is one [`ChannelEvent`]. Malformed lines are logged and
//! skipped, like unreadable lines in any other line-oriented input.

use archive_core::models::ChannelEvent;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub forwarded: u64,
    pub malformed: u64,
}

/// Parse events from `reader` and forward them to the ingestor.
///
/// Stops at end of input or when the ingestor side is gone.
pub async fn forward_events<R>(reader: R, tx: mpsc::Sender<ChannelEvent>) -> anyhow::Result<FeedStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = FeedStats::default();
    let mut lines = reader.lines();
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let event: ChannelEvent = match serde_json::from_str(trimmed) {
            Ok(event) => event,
            Err(e) => {
                stats.malformed += 1;
                warn!("Skipping malformed event on line {}: {}", line_no, e);
                continue;
            }
        };

        if tx.send(event).await.is_err() {
            warn!("ingestor stopped; no longer forwarding events");
            break;
        }
        stats.forwarded += 1;
    }

    debug!(
        "Feed finished: {} forwarded, {} malformed",
        stats.forwarded, stats.malformed
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST: &str = r#"{"kind":"top_level_post","peer_id":-100,"is_group_or_channel":true,"published_at":"2024-01-05T07:00:00Z","text":"hi"}"#;

    #[tokio::test]
    async fn test_forward_events_skips_malformed_and_blank_lines() {
        let input = format!("{}\n\n{{not json\n{}\n", POST, r#"{"kind":"other"}"#);
        let (tx, mut rx) = mpsc::channel(8);

        let stats = forward_events(input.as_bytes(), tx).await.unwrap();
        assert_eq!(
            stats,
            FeedStats {
                forwarded: 2,
                malformed: 1
            }
        );

        assert!(matches!(rx.recv().await, Some(ChannelEvent::TopLevelPost(_))));
        assert_eq!(rx.recv().await, Some(ChannelEvent::Other));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_forward_events_stops_when_receiver_dropped() {
        let input = format!("{}\n{}\n", POST, POST);
        let (tx, rx) = mpsc::channel(8);
        drop(rx);

        let stats = forward_events(input.as_bytes(), tx).await.unwrap();
        assert_eq!(stats.forwarded, 0);
    }
}
