use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::error::{ArchiveError, Result};
use crate::time_utils::{TimezoneHandler, REFERENCE_TIMEZONE};

/// File name of the live post table inside the data directory.
pub const STORE_FILE_NAME: &str = "channel_posts.csv";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Archive channel posts and export them by month
#[derive(Parser, Debug, Clone)]
#[command(
    name = "post-archive",
    about = "Archive channel posts and export them by month",
    version
)]
pub struct Settings {
    /// Path of the post table (defaults to ~/.post-archive/channel_posts.csv)
    #[arg(long, global = true, env = "POST_ARCHIVE_STORE")]
    pub store: Option<PathBuf>,

    /// Directory export files are built in (defaults to ~/.post-archive/exports)
    #[arg(long, global = true, env = "POST_ARCHIVE_EXPORT_DIR")]
    pub export_dir: Option<PathBuf>,

    /// Timezone ingested timestamps are converted to before storage
    #[arg(long, global = true, default_value = REFERENCE_TIMEZONE)]
    pub reference_timezone: String,

    /// Timezone used to decide the current month for exports
    #[arg(long, global = true, default_value = "auto")]
    pub timezone: String,

    /// Store the time of day next to the publication date
    #[arg(long, global = true)]
    pub store_time_of_day: bool,

    /// JSON file mapping peer ids to channel titles
    #[arg(long, global = true, env = "POST_ARCHIVE_PEERS")]
    pub peers: Option<PathBuf>,

    /// Logging level
    #[arg(long, global = true, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create the post table if it does not exist
    Init,
    /// Read channel events as JSON lines from stdin and archive them
    Ingest,
    /// Export posts and deliver the file to a directory
    Export {
        #[command(subcommand)]
        scope: ExportScope,

        /// Directory the exported file is delivered to
        #[arg(long, global = true, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ExportScope {
    /// Posts of the current month
    Current,
    /// The whole table
    All,
    /// Posts of one month of the current year
    Month {
        #[arg(value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
    },
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Data directory rooted at `home`: `<home>/.post-archive`.
    pub fn base_dir_in(home: &Path) -> PathBuf {
        home.join(".post-archive")
    }

    /// Data directory under the user's home, or `./.post-archive`.
    pub fn base_dir() -> PathBuf {
        Self::base_dir_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    pub fn store_path(&self) -> PathBuf {
        self.store
            .clone()
            .unwrap_or_else(|| Self::base_dir().join(STORE_FILE_NAME))
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(|| Self::base_dir().join("exports"))
    }

    /// `--debug` overrides `--log-level`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }

    /// Reject timezone names that would otherwise silently fall back.
    pub fn validate(&self) -> Result<()> {
        if !TimezoneHandler::validate_timezone(&self.reference_timezone) {
            return Err(ArchiveError::Config(format!(
                "unknown reference timezone \"{}\"",
                self.reference_timezone
            )));
        }
        if !self.timezone.eq_ignore_ascii_case("auto")
            && !TimezoneHandler::validate_timezone(&self.timezone)
        {
            return Err(ArchiveError::Config(format!(
                "unknown timezone \"{}\"",
                self.timezone
            )));
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
