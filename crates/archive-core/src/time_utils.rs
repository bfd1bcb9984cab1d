use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

/// IANA name of the timezone ingested timestamps are converted to.
pub const REFERENCE_TIMEZONE: &str = "Europe/Moscow";

/// Storage format for a calendar date.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Storage format for a date with time of day.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve a timezone setting to a [`Tz`].
///
/// `"auto"` means the system timezone. Unknown names fall back to UTC and
/// log a warning.
pub fn resolve_timezone(name: &str) -> Tz {
    let name = if name.eq_ignore_ascii_case("auto") {
        get_system_timezone()
    } else {
        name.to_string()
    };
    name.parse::<Tz>().unwrap_or_else(|_| {
        warn!("unrecognised timezone \"{}\", falling back to UTC", name);
        Tz::UTC
    })
}

/// `(year, month)` of `now` as seen from `tz`.
pub fn year_month_at(now: DateTime<Utc>, tz: Tz) -> (i32, u32) {
    let local = now.with_timezone(&tz);
    (local.year(), local.month())
}

/// `(year, month)` of the current instant as seen from `tz`.
pub fn current_year_month(tz: Tz) -> (i32, u32) {
    year_month_at(Utc::now(), tz)
}

// ── DateNormalizer ────────────────────────────────────────────────────────────

/// One accepted textual date layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pattern {
    DateTime(&'static str),
    Date(&'static str),
}

/// Canonical layouts, tried in order. The first one that parses wins.
const CANONICAL_PATTERNS: &[Pattern] = &[
    Pattern::DateTime(DATETIME_FORMAT),
    Pattern::Date(DATE_FORMAT),
];

/// A stored date that matched one of the canonical layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalDate {
    value: NaiveDateTime,
    has_time: bool,
}

impl CanonicalDate {
    pub fn year(&self) -> i32 {
        self.value.year()
    }

    pub fn month(&self) -> u32 {
        self.value.month()
    }

    pub fn date(&self) -> NaiveDate {
        self.value.date()
    }

    /// `true` when the source text carried a time of day.
    pub fn has_time(&self) -> bool {
        self.has_time
    }

    /// Render back into the layout the value was parsed from.
    pub fn format(&self) -> String {
        if self.has_time {
            self.value.format(DATETIME_FORMAT).to_string()
        } else {
            self.value.format(DATE_FORMAT).to_string()
        }
    }
}

/// Parses stored date text into a [`CanonicalDate`].
pub struct DateNormalizer;

impl DateNormalizer {
    /// Try every canonical layout in priority order.
    ///
    /// Returns `None` when nothing matches; callers skip such rows.
    pub fn parse(text: &str) -> Option<CanonicalDate> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        CANONICAL_PATTERNS.iter().find_map(|pattern| match *pattern {
            Pattern::DateTime(fmt) => NaiveDateTime::parse_from_str(text, fmt)
                .ok()
                .map(|value| CanonicalDate {
                    value,
                    has_time: true,
                }),
            Pattern::Date(fmt) => NaiveDate::parse_from_str(text, fmt)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|value| CanonicalDate {
                    value,
                    has_time: false,
                }),
        })
    }
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Converts UTC event timestamps into the reference timezone for storage.
#[derive(Debug, Clone, Copy)]
pub struct TimezoneHandler {
    reference_tz: Tz,
}

impl Default for TimezoneHandler {
    fn default() -> Self {
        Self {
            reference_tz: Tz::Europe__Moscow,
        }
    }
}

impl TimezoneHandler {
    /// Create a handler for the given IANA timezone name.
    ///
    /// Unrecognised names fall back to [`REFERENCE_TIMEZONE`] and log a
    /// warning.
    pub fn new(tz_name: &str) -> Self {
        match tz_name.parse::<Tz>() {
            Ok(reference_tz) => Self { reference_tz },
            Err(_) => {
                warn!(
                    "TimezoneHandler: unrecognised timezone \"{}\", falling back to {}",
                    tz_name, REFERENCE_TIMEZONE
                );
                Self::default()
            }
        }
    }

    /// Validate that `tz_name` is a recognised IANA timezone identifier.
    pub fn validate_timezone(tz_name: &str) -> bool {
        tz_name.parse::<Tz>().is_ok()
    }

    pub fn reference_tz(&self) -> Tz {
        self.reference_tz
    }

    pub fn to_reference(&self, dt: DateTime<Utc>) -> DateTime<Tz> {
        dt.with_timezone(&self.reference_tz)
    }

    /// Calendar date of `dt` in the reference timezone, as `YYYY-MM-DD`.
    pub fn to_reference_date(&self, dt: DateTime<Utc>) -> String {
        self.to_reference(dt).format(DATE_FORMAT).to_string()
    }

    /// Date and time of `dt` in the reference timezone, as
    /// `YYYY-MM-DD HH:MM:SS`.
    pub fn to_reference_datetime(&self, dt: DateTime<Utc>) -> String {
        self.to_reference(dt).format(DATETIME_FORMAT).to_string()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    // ── DateNormalizer::parse ────────────────────────────────────────────────

    #[test]
    fn test_parse_datetime_layout() {
        let d = DateNormalizer::parse("2024-01-05 10:00:00").unwrap();
        assert_eq!(d.year(), 2024);
        assert_eq!(d.month(), 1);
        assert!(d.has_time());
        assert_eq!(d.format(), "2024-01-05 10:00:00");
    }

    #[test]
    fn test_parse_date_layout() {
        let d = DateNormalizer::parse("2024-02-01").unwrap();
        assert_eq!((d.year(), d.month()), (2024, 2));
        assert!(!d.has_time());
        assert_eq!(d.format(), "2024-02-01");
        assert_eq!(d.date(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert!(DateNormalizer::parse("  2024-03-10 \n").is_some());
    }

    #[test]
    fn test_parse_garbage_returns_none() {
        assert!(DateNormalizer::parse("not-a-date").is_none());
        assert!(DateNormalizer::parse("garbage").is_none());
        assert!(DateNormalizer::parse("").is_none());
    }

    #[test]
    fn test_parse_rejects_other_layouts() {
        // ISO `T` separator and day-first layouts are not canonical.
        assert!(DateNormalizer::parse("2024-01-05T10:00:00").is_none());
        assert!(DateNormalizer::parse("05.01.2024").is_none());
        assert!(DateNormalizer::parse("2024-01-05 10:00").is_none());
    }

    #[test]
    fn test_parse_rejects_impossible_dates() {
        assert!(DateNormalizer::parse("2024-02-30").is_none());
        assert!(DateNormalizer::parse("2024-13-01 00:00:00").is_none());
    }

    // ── TimezoneHandler ──────────────────────────────────────────────────────

    #[test]
    fn test_new_valid_timezone() {
        let handler = TimezoneHandler::new("Asia/Tokyo");
        assert_eq!(handler.reference_tz(), Tz::Asia__Tokyo);
    }

    #[test]
    fn test_new_invalid_timezone_falls_back_to_moscow() {
        let handler = TimezoneHandler::new("Mars/Olympus");
        assert_eq!(handler.reference_tz(), Tz::Europe__Moscow);
    }

    #[test]
    fn test_validate_timezone() {
        assert!(TimezoneHandler::validate_timezone("Europe/Moscow"));
        assert!(!TimezoneHandler::validate_timezone("not-a-timezone"));
    }

    #[test]
    fn test_to_reference_date_crosses_midnight() {
        let handler = TimezoneHandler::default();
        // 22:30 UTC on Jan 31 is 01:30 on Feb 1 in Moscow (UTC+3).
        let utc = Utc.with_ymd_and_hms(2024, 1, 31, 22, 30, 0).unwrap();
        assert_eq!(handler.to_reference_date(utc), "2024-02-01");
        assert_eq!(handler.to_reference_datetime(utc), "2024-02-01 01:30:00");
    }

    #[test]
    fn test_to_reference_date_same_day() {
        let handler = TimezoneHandler::default();
        let utc = Utc.with_ymd_and_hms(2024, 6, 15, 7, 0, 0).unwrap();
        assert_eq!(handler.to_reference_date(utc), "2024-06-15");
    }

    #[test]
    fn test_reference_date_round_trips_through_normalizer() {
        let handler = TimezoneHandler::default();
        let utc = Utc.with_ymd_and_hms(2023, 12, 31, 21, 15, 0).unwrap();
        let stored = handler.to_reference_date(utc);
        let parsed = DateNormalizer::parse(&stored).unwrap();
        assert_eq!((parsed.year(), parsed.month()), (2024, 1));
    }

    // ── year/month helpers ───────────────────────────────────────────────────

    #[test]
    fn test_year_month_at_uses_timezone() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 0, 0).unwrap();
        assert_eq!(year_month_at(now, Tz::UTC), (2024, 12));
        assert_eq!(year_month_at(now, Tz::Europe__Moscow), (2025, 1));
    }

    #[test]
    fn test_resolve_timezone_named_and_invalid() {
        assert_eq!(resolve_timezone("Europe/Berlin"), Tz::Europe__Berlin);
        assert_eq!(resolve_timezone("Nowhere/Special"), Tz::UTC);
    }

    #[test]
    fn test_get_system_timezone_returns_nonempty_string() {
        assert!(!get_system_timezone().is_empty());
    }
}
