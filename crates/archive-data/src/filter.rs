//! Month/year selection over stored rows.
//!
//! Rows whose date text matches no canonical layout are skipped, never
//! reported as errors. Results keep append order.

use archive_core::models::RawRow;
use archive_core::time_utils::{current_year_month, DateNormalizer};
use chrono_tz::Tz;
use tracing::debug;

/// Rows dated in `month` of `year`.
pub fn by_month_year(rows: &[RawRow], month: u32, year: i32) -> Vec<RawRow> {
    let mut skipped = 0usize;

    let selected: Vec<RawRow> = rows
        .iter()
        .filter(|row| match DateNormalizer::parse(&row.date_text) {
            Some(date) => date.month() == month && date.year() == year,
            None => {
                skipped += 1;
                false
            }
        })
        .cloned()
        .collect();

    if skipped > 0 {
        debug!(
            "Skipped {} row(s) with unparseable dates while selecting {}-{:02}",
            skipped, year, month
        );
    }

    selected
}

/// Rows dated in the current month, with "now" taken in `tz` at call time.
pub fn by_current_month(rows: &[RawRow], tz: Tz) -> Vec<RawRow> {
    let (year, month) = current_year_month(tz);
    by_month_year(rows, month, year)
}

/// Rows dated in `month` of the current year in `tz`.
pub fn by_month_of_current_year(rows: &[RawRow], month: u32, tz: Tz) -> Vec<RawRow> {
    let (year, _) = current_year_month(tz);
    by_month_year(rows, month, year)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
