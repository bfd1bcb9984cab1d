use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the post archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The backing store file does not exist.
    #[error("Store file not found: {0}")]
    StoreMissing(PathBuf),

    /// The backing store exists but its contents are not a valid post table.
    #[error("Store file {path} is corrupt: {reason}")]
    CorruptStore { path: PathBuf, reason: String },

    /// A store or export file could not be opened, written or synced.
    #[error("Storage failure on {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tabular codec rejected a row.
    #[error("Failed to encode or decode table row: {0}")]
    Csv(#[from] csv::Error),

    /// A channel event could not be turned into a record.
    #[error("Failed to extract post from peer {peer}: {message}")]
    Extraction { peer: String, message: String },

    /// A record violates its invariants (blank source, non-canonical date).
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// A month number outside `1..=12`.
    #[error("Invalid month: {0}")]
    InvalidMonth(u32),

    /// An export file could not be handed over to the requester.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ArchiveError {
    /// Wrap an I/O error that happened on `path`.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// `true` for the storage family: missing, corrupt or unwritable files.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::StoreMissing(_)
                | Self::CorruptStore { .. }
                | Self::Storage { .. }
                | Self::Csv(_)
                | Self::Io(_)
        )
    }
}

/// Convenience alias used throughout the archive crates.
pub type Result<T> = std::result::Result<T, ArchiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_store_missing() {
        let err = ArchiveError::StoreMissing(PathBuf::from("/data/channel_posts.csv"));
        assert_eq!(
            err.to_string(),
            "Store file not found: /data/channel_posts.csv"
        );
    }

    #[test]
    fn test_error_display_corrupt_store() {
        let err = ArchiveError::CorruptStore {
            path: PathBuf::from("/data/posts.csv"),
            reason: "unexpected header".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/data/posts.csv"));
        assert!(msg.contains("unexpected header"));
    }

    #[test]
    fn test_error_display_storage() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only fs");
        let err = ArchiveError::storage("/data/posts.csv", io_err);
        let msg = err.to_string();
        assert!(msg.contains("Storage failure"));
        assert!(msg.contains("/data/posts.csv"));
        assert!(msg.contains("read-only fs"));
    }

    #[test]
    fn test_error_display_extraction() {
        let err = ArchiveError::Extraction {
            peer: "-10042".to_string(),
            message: "peer lookup timed out".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to extract post from peer -10042: peer lookup timed out"
        );
    }

    #[test]
    fn test_error_display_invalid_month() {
        assert_eq!(ArchiveError::InvalidMonth(13).to_string(), "Invalid month: 13");
    }

    #[test]
    fn test_storage_classification() {
        assert!(ArchiveError::StoreMissing(PathBuf::from("x")).is_storage());
        assert!(ArchiveError::Io(std::io::Error::other("boom")).is_storage());
        assert!(!ArchiveError::InvalidMonth(0).is_storage());
        assert!(!ArchiveError::Delivery("chat gone".to_string()).is_storage());
        assert!(!ArchiveError::Extraction {
            peer: "1".to_string(),
            message: "m".to_string()
        }
        .is_storage());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ArchiveError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }
}
