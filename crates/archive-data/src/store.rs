//! Append-only post table backed by a CSV file.
//!
//! The table starts with the fixed [`HEADER`] row; every following row is one
//! [`Record`]. Appends hold an exclusive lock for the whole
//! check-write-sync cycle, reads and copies hold a shared one.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use archive_core::error::{ArchiveError, Result};
use archive_core::models::{RawRow, Record, HEADER};
use tracing::{debug, info};

// ── Store ─────────────────────────────────────────────────────────────────────

/// Handle to the live post table.
///
/// Share it between tasks behind an `Arc`; the internal lock serializes
/// writers against each other and against readers.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    lock: RwLock<()>,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the table with just the header row if it does not exist.
    ///
    /// Returns `true` when the file was created. An existing file is never
    /// touched, so this is safe to call at every start.
    pub fn ensure_initialized(&self) -> Result<bool> {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ArchiveError::storage(parent, e))?;
        }

        let file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("Store {} already exists", self.path.display());
                return Ok(false);
            }
            Err(e) => return Err(ArchiveError::storage(&self.path, e)),
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(HEADER)?;
        let file = writer
            .into_inner()
            .map_err(|e| ArchiveError::storage(&self.path, e.into_error()))?;
        file.sync_all()
            .map_err(|e| ArchiveError::storage(&self.path, e))?;

        info!("Created store {}", self.path.display());
        Ok(true)
    }

    /// Append one row and sync it to disk.
    ///
    /// Prior rows are never rewritten. A last row written without a line
    /// terminator gets one before the new row. Fails when the file is missing
    /// or its header is not the post table header.
    pub fn append(&self, record: &Record) -> Result<()> {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);

        self.check_header()?;

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.open_error(e))?;

        if !ends_with_newline(&mut file).map_err(|e| ArchiveError::storage(&self.path, e))? {
            debug!("Store {} lacks a final line terminator", self.path.display());
            file.write_all(b"\n")
                .map_err(|e| ArchiveError::storage(&self.path, e))?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(record.to_fields())?;
        let file = writer
            .into_inner()
            .map_err(|e| ArchiveError::storage(&self.path, e.into_error()))?;
        file.sync_all()
            .map_err(|e| ArchiveError::storage(&self.path, e))?;

        debug!(
            "Appended post from {} dated {}",
            record.source_name(),
            record.published_at()
        );
        Ok(())
    }

    /// All rows after the header, in append order. Dates are left as text.
    pub fn read_all(&self) -> Result<Vec<RawRow>> {
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);

        let file = File::open(&self.path).map_err(|e| self.open_error(e))?;
        self.parse_rows(file)
    }

    /// Number of rows after the header.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read_all()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Copy the whole file, header included, into `dest` and return its row
    /// count.
    ///
    /// The bytes are validated as a table before anything is written, and
    /// both happen under one shared lock, so the count always matches the
    /// copy. The live file is only read.
    pub fn copy_to(&self, dest: &mut impl Write) -> Result<usize> {
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);

        let bytes = std::fs::read(&self.path).map_err(|e| self.open_error(e))?;
        let rows = self.parse_rows(bytes.as_slice())?.len();
        dest.write_all(&bytes)?;
        Ok(rows)
    }

    // ── Private ───────────────────────────────────────────────────────────────

    /// Decode a full table. Caller holds the lock.
    fn parse_rows(&self, src: impl Read) -> Result<Vec<RawRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(src);

        let headers = reader.headers()?.clone();
        if !headers.iter().eq(HEADER.iter().copied()) {
            return Err(self.corrupt(format!("unexpected header {:?}", headers)));
        }

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| self.corrupt(e.to_string()))?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();

            let reaction_text = record.get(3).unwrap_or_default().trim();
            let reaction_count = if reaction_text.is_empty() {
                0
            } else {
                reaction_text.parse::<u64>().map_err(|_| {
                    self.corrupt(format!(
                        "line {}: reaction count \"{}\" is not a non-negative integer",
                        line, reaction_text
                    ))
                })?
            };

            rows.push(RawRow {
                date_text: record.get(0).unwrap_or_default().to_string(),
                source_name: record.get(1).unwrap_or_default().to_string(),
                content: record.get(2).unwrap_or_default().to_string(),
                reaction_count,
            });
        }

        Ok(rows)
    }

    /// Verify the first row is the post table header. Caller holds the lock.
    fn check_header(&self) -> Result<()> {
        let file = File::open(&self.path).map_err(|e| self.open_error(e))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(file);

        let mut first = csv::StringRecord::new();
        let has_row = reader
            .read_record(&mut first)
            .map_err(|e| self.corrupt(e.to_string()))?;

        if !has_row {
            return Err(self.corrupt("missing header row".to_string()));
        }
        if !first.iter().eq(HEADER.iter().copied()) {
            return Err(self.corrupt(format!("unexpected header {:?}", first)));
        }
        Ok(())
    }

    fn open_error(&self, e: std::io::Error) -> ArchiveError {
        if e.kind() == ErrorKind::NotFound {
            ArchiveError::StoreMissing(self.path.clone())
        } else {
            ArchiveError::storage(&self.path, e)
        }
    }

    fn corrupt(&self, reason: String) -> ArchiveError {
        ArchiveError::CorruptStore {
            path: self.path.clone(),
            reason,
        }
    }
}

/// Whether a non-empty file's last byte is `\n`.
fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

// ── Tests ─────────────────────────────────────────────────────────────────────
