//! Export commands as seen from the chat side.
//!
//! Maps button presses and callback payloads to export intents, runs the
//! export, hands the file to a [`DocumentSink`] and deletes it afterwards.

use std::path::{Path, PathBuf};

use archive_core::error::{ArchiveError, Result};
use archive_data::exporter::{ExportFile, Exporter};
use chrono_tz::Tz;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

pub const START_COMMAND: &str = "/start";
pub const BUTTON_CURRENT_MONTH: &str = "Export current month";
pub const BUTTON_EVERYTHING: &str = "Export full table";
pub const BUTTON_PICK_MONTH: &str = "Export a specific month";
pub const MONTH_CALLBACK_PREFIX: &str = "month_";

const GREETING: &str = "Hi! Choose an action:";
const PICK_MONTH_PROMPT: &str = "Choose a month of the current year:";
const FULL_TABLE_CAPTION: &str = "Full posts table";

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

// ── Requests and replies ──────────────────────────────────────────────────────

/// Which posts the requester wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    CurrentMonth,
    Everything,
    /// A month (1–12) of the current year.
    Month(u32),
}

/// Anything the chat side can send us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Start,
    PickMonth,
    Export(Intent),
}

impl Request {
    /// Interpret a plain text message. `None` for unrelated text.
    pub fn from_text(text: &str) -> Option<Self> {
        match text.trim() {
            START_COMMAND => Some(Self::Start),
            BUTTON_CURRENT_MONTH => Some(Self::Export(Intent::CurrentMonth)),
            BUTTON_EVERYTHING => Some(Self::Export(Intent::Everything)),
            BUTTON_PICK_MONTH => Some(Self::PickMonth),
            _ => None,
        }
    }

    /// Interpret inline-button callback data such as `month_3`.
    pub fn from_callback(data: &str) -> Option<Self> {
        let month: u32 = data.strip_prefix(MONTH_CALLBACK_PREFIX)?.parse().ok()?;
        (1..=12)
            .contains(&month)
            .then_some(Self::Export(Intent::Month(month)))
    }
}

/// A keyboard button. Reply-keyboard buttons have no callback data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub callback_data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Menu { text: String, buttons: Vec<Button> },
    Delivered { caption: String, rows: usize },
    Failed { message: String },
}

/// The three reply-keyboard actions.
pub fn main_keyboard() -> Vec<Button> {
    [BUTTON_CURRENT_MONTH, BUTTON_EVERYTHING, BUTTON_PICK_MONTH]
        .into_iter()
        .map(|label| Button {
            label: label.to_string(),
            callback_data: None,
        })
        .collect()
}

/// One inline button per month, carrying `month_<n>`.
pub fn month_keyboard() -> Vec<Button> {
    MONTH_NAMES
        .iter()
        .zip(1u32..)
        .map(|(name, month)| Button {
            label: name.to_string(),
            callback_data: Some(format!("{}{}", MONTH_CALLBACK_PREFIX, month)),
        })
        .collect()
}

// ── Delivery ──────────────────────────────────────────────────────────────────

/// Hands an export file to whoever asked for it.
///
/// The file is deleted right after this returns, so implementations must
/// finish reading it before returning.
pub trait DocumentSink: Send + Sync {
    fn send_document(&self, path: &Path, caption: &str) -> Result<()>;
}

/// Delivers by copying the file into a local directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DocumentSink for DirectorySink {
    fn send_document(&self, path: &Path, caption: &str) -> Result<()> {
        let name = path
            .file_name()
            .ok_or_else(|| ArchiveError::Delivery(format!("{} has no file name", path.display())))?;
        std::fs::create_dir_all(&self.dir).map_err(|e| ArchiveError::storage(&self.dir, e))?;

        let dest = self.dir.join(name);
        std::fs::copy(path, &dest).map_err(|e| {
            ArchiveError::Delivery(format!("copy to {} failed: {}", dest.display(), e))
        })?;
        info!("{}: {}", caption, dest.display());
        Ok(())
    }
}

// ── CommandInterface ──────────────────────────────────────────────────────────

/// A request paired with the channel its reply goes back on.
pub struct CommandRequest {
    pub request: Request,
    pub reply_to: oneshot::Sender<Reply>,
}

pub struct CommandInterface<S> {
    exporter: Exporter,
    sink: S,
    timezone: Tz,
}

impl<S: DocumentSink> CommandInterface<S> {
    /// `timezone` decides what "current" month and year mean.
    pub fn new(exporter: Exporter, sink: S, timezone: Tz) -> Self {
        Self {
            exporter,
            sink,
            timezone,
        }
    }

    pub fn handle(&self, request: Request) -> Reply {
        match request {
            Request::Start => Reply::Menu {
                text: GREETING.to_string(),
                buttons: main_keyboard(),
            },
            Request::PickMonth => Reply::Menu {
                text: PICK_MONTH_PROMPT.to_string(),
                buttons: month_keyboard(),
            },
            Request::Export(intent) => self.export(intent),
        }
    }

    /// Build, deliver and delete one export file.
    ///
    /// Errors never escape: they become [`Reply::Failed`].
    pub fn export(&self, intent: Intent) -> Reply {
        let file = match self.build(intent) {
            Ok(file) => file,
            Err(e) => {
                warn!(?intent, error = %e, "export failed");
                return Reply::Failed {
                    message: format!("Export failed: {}", e),
                };
            }
        };

        let caption = caption_for(&file);
        let rows = file.rows();
        let delivered = self.sink.send_document(file.path(), &caption);

        let path = file.path().to_path_buf();
        if let Err(e) = file.remove() {
            warn!(path = %path.display(), error = %e, "could not delete export file");
        }

        match delivered {
            Ok(()) => Reply::Delivered { caption, rows },
            Err(e) => {
                warn!(?intent, error = %e, "delivery failed");
                Reply::Failed {
                    message: format!("Could not send the file: {}", e),
                }
            }
        }
    }

    fn build(&self, intent: Intent) -> Result<ExportFile> {
        match intent {
            Intent::CurrentMonth => self.exporter.export_current_month(self.timezone),
            Intent::Everything => self.exporter.export_full(),
            Intent::Month(month) => self
                .exporter
                .export_month_of_current_year(month, self.timezone),
        }
    }
}

impl<S: DocumentSink + 'static> CommandInterface<S> {
    /// Serve requests from `rx` in a dedicated tokio task until every sender
    /// is dropped.
    pub fn spawn(self, mut rx: mpsc::Receiver<CommandRequest>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(CommandRequest { request, reply_to }) = rx.recv().await {
                let reply = self.handle(request);
                if reply_to.send(reply).is_err() {
                    warn!(?request, "requester went away before the reply was sent");
                }
            }
            tracing::debug!("command channel closed; exiting loop");
        })
    }
}

fn caption_for(file: &ExportFile) -> String {
    match file.period() {
        Some((year, month)) => format!("Posts for {}-{:02}", year, month),
        None => FULL_TABLE_CAPTION.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
