//! Peer id → channel title lookup used by the ingestor.

use std::collections::HashMap;
use std::path::Path;

use anyhow::anyhow;
use archive_core::error::{ArchiveError, Result};
use tracing::debug;

/// Resolves the display name of the chat a post came from.
///
/// The channel listener implements this against its network client; the
/// binary uses a static [`PeerTitles`] map.
pub trait PeerDirectory: Send + Sync {
    fn resolve_name(&self, peer_id: i64) -> Result<String>;
}

/// Fixed map of peer ids to titles, optionally loaded from a JSON object
/// such as `{"-1001234": "Daily News"}`.
#[derive(Debug, Clone, Default)]
pub struct PeerTitles {
    titles: HashMap<i64, String>,
}

impl PeerTitles {
    pub fn new(titles: HashMap<i64, String>) -> Self {
        Self { titles }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ArchiveError::storage(path, e))?;
        let titles: HashMap<i64, String> = serde_json::from_str(&content).map_err(|e| {
            ArchiveError::Config(format!("invalid peer file {}: {}", path.display(), e))
        })?;
        debug!("Loaded {} peer title(s) from {}", titles.len(), path.display());
        Ok(Self { titles })
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

impl PeerDirectory for PeerTitles {
    fn resolve_name(&self, peer_id: i64) -> Result<String> {
        self.titles
            .get(&peer_id)
            .cloned()
            .ok_or_else(|| ArchiveError::Other(anyhow!("no title known for peer {}", peer_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_known_and_unknown() {
        let titles = PeerTitles::new(HashMap::from([(-100, "News".to_string())]));
        assert_eq!(titles.resolve_name(-100).unwrap(), "News");

        let err = titles.resolve_name(5).unwrap_err();
        assert!(err.to_string().contains("no title known for peer 5"));
    }

    #[test]
    fn test_load_from_json_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("peers.json");
        std::fs::write(&path, r#"{"-1001234": "Daily News", "42": "Group"}"#).unwrap();

        let titles = PeerTitles::load_from(&path).unwrap();
        assert_eq!(titles.len(), 2);
        assert_eq!(titles.resolve_name(-1001234).unwrap(), "Daily News");
        assert_eq!(titles.resolve_name(42).unwrap(), "Group");
    }

    #[test]
    fn test_load_from_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("peers.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        assert!(matches!(
            PeerTitles::load_from(&path),
            Err(ArchiveError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = PeerTitles::load_from(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.is_storage());
    }
}
