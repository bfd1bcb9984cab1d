//! Export of stored posts into standalone tables.
//!
//! Every export is built in a temp file inside the export directory, synced,
//! and renamed into place, so a returned [`ExportFile`] is always complete.
//! The live store is only read.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use archive_core::error::{ArchiveError, Result};
use archive_core::models::{RawRow, HEADER};
use archive_core::time_utils::current_year_month;
use chrono_tz::Tz;
use tempfile::NamedTempFile;
use tracing::info;

use crate::filter;
use crate::store::Store;

/// Extension of every exported table.
pub const EXPORT_EXTENSION: &str = "csv";

/// File name of a month export, e.g. `posts_2024-03.csv`.
pub fn month_file_name(year: i32, month: u32) -> String {
    format!("posts_{:04}-{:02}.{}", year, month, EXPORT_EXTENSION)
}

/// File name of a full export.
pub fn full_file_name() -> String {
    format!("all_posts.{}", EXPORT_EXTENSION)
}

// ── ExportFile ────────────────────────────────────────────────────────────────

/// A finished export on disk. The caller removes it after handing it over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    path: PathBuf,
    rows: usize,
    period: Option<(i32, u32)>,
}

impl ExportFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of data rows, header excluded.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// `(year, month)` of a month export, `None` for a full export.
    pub fn period(&self) -> Option<(i32, u32)> {
        self.period
    }

    /// Delete the file from disk.
    pub fn remove(self) -> Result<()> {
        std::fs::remove_file(&self.path).map_err(|e| ArchiveError::storage(&self.path, e))
    }
}

// ── Exporter ──────────────────────────────────────────────────────────────────

/// Builds export files from a shared [`Store`].
#[derive(Debug, Clone)]
pub struct Exporter {
    store: Arc<Store>,
    export_dir: PathBuf,
}

impl Exporter {
    pub fn new(store: Arc<Store>, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            export_dir: export_dir.into(),
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Header plus every row dated in `month` of `year`.
    ///
    /// No matching rows still yields a valid file holding only the header.
    pub fn export_month(&self, month: u32, year: i32) -> Result<ExportFile> {
        if !(1..=12).contains(&month) {
            return Err(ArchiveError::InvalidMonth(month));
        }

        let rows = self.store.read_all()?;
        let selected = filter::by_month_year(&rows, month, year);
        let path = self.export_dir.join(month_file_name(year, month));

        self.write_atomically(&path, |file| write_table(file, &selected))?;

        info!(
            "Exported {} of {} post(s) for {}-{:02} to {}",
            selected.len(),
            rows.len(),
            year,
            month,
            path.display()
        );
        Ok(ExportFile {
            path,
            rows: selected.len(),
            period: Some((year, month)),
        })
    }

    /// A month of the current year, with "now" taken in `tz`.
    pub fn export_month_of_current_year(&self, month: u32, tz: Tz) -> Result<ExportFile> {
        let (year, _) = current_year_month(tz);
        self.export_month(month, year)
    }

    /// The current month, with "now" taken in `tz`.
    pub fn export_current_month(&self, tz: Tz) -> Result<ExportFile> {
        let (year, month) = current_year_month(tz);
        self.export_month(month, year)
    }

    /// Independent copy of the entire store, header included.
    pub fn export_full(&self) -> Result<ExportFile> {
        let path = self.export_dir.join(full_file_name());

        let rows = self.write_atomically(&path, |file| self.store.copy_to(file))?;

        info!("Exported full table ({} post(s)) to {}", rows, path.display());
        Ok(ExportFile {
            path,
            rows,
            period: None,
        })
    }

    // ── Private ───────────────────────────────────────────────────────────────

    /// Fill a temp file with `fill`, sync it, then rename it onto `path`.
    ///
    /// When `fill` fails the temp file is dropped and `path` is left as it was.
    fn write_atomically<T>(
        &self,
        path: &Path,
        fill: impl FnOnce(&mut std::fs::File) -> Result<T>,
    ) -> Result<T> {
        std::fs::create_dir_all(&self.export_dir)
            .map_err(|e| ArchiveError::storage(&self.export_dir, e))?;

        let mut tmp = NamedTempFile::new_in(&self.export_dir)
            .map_err(|e| ArchiveError::storage(&self.export_dir, e))?;

        let value = fill(tmp.as_file_mut())?;

        tmp.as_file_mut()
            .flush()
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| ArchiveError::storage(tmp.path(), e))?;

        tmp.persist(path)
            .map_err(|e| ArchiveError::storage(path, e.error))?;
        Ok(value)
    }
}

/// Write the header and `rows` as a complete table.
fn write_table(dest: &mut impl Write, rows: &[RawRow]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(dest);
    writer.write_record(HEADER)?;
    for row in rows {
        writer.write_record(row.to_fields())?;
    }
    writer.flush()?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
