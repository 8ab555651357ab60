//! Date normalization for heterogeneous cell values
//!
//! Production sheets mix real date cells, text in several layouts and
//! placeholder words such as `WIP`. Every cell maps to a [`DateOutcome`];
//! nothing here aborts a run.
//!
//! Resolution order:
//! 1. Sentinels (`WIP`, `NA`, `N/A`, blank; case-insensitive, trimmed) are missing.
//! 2. Explicit formats in [`DATE_FORMATS`] order; the first match wins.
//! 3. A permissive fallback (datetimes, RFC 3339, month names, day-first,
//!    spreadsheet serial numbers).
//! 4. Otherwise the value is unparsable and reported as a warning.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};
use tracing::warn;

use crate::notify::{Notifier, Warning, WarningKind};
use crate::Cell;

/// Placeholder values that mean "no date yet"
pub const SENTINELS: [&str; 4] = ["WIP", "NA", "N/A", ""];

/// Explicit formats, tried in priority order
pub const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y", "%Y/%m/%d"];

const FALLBACK_DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const FALLBACK_DATE_FORMATS: [&str; 12] = [
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%Y.%m.%d",
    "%d.%m.%Y",
    "%m/%d/%y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%Y%m%d",
];

/// Largest serial number a spreadsheet can hold (9999-12-31)
const MAX_SERIAL: f64 = 2_958_465.0;

/// Result of normalizing one cell
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DateOutcome {
    /// A calendar date
    Date(NaiveDate),
    /// Blank or placeholder value
    Missing,
    /// Something that is not a date; carries the raw text
    Unparsable(String),
}

impl DateOutcome {
    /// The parsed date, or `None` for both missing and unparsable values
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            DateOutcome::Date(d) => Some(*d),
            _ => None,
        }
    }
}

/// Classify a cell without side effects
pub fn classify(cell: &Cell) -> DateOutcome {
    match cell {
        Cell::Empty => DateOutcome::Missing,
        Cell::Date(d) => DateOutcome::Date(*d),
        Cell::Number(n) => from_serial(*n)
            .map(DateOutcome::Date)
            .unwrap_or_else(|| DateOutcome::Unparsable(cell.to_string())),
        Cell::Bool(_) => DateOutcome::Unparsable(cell.to_string()),
        Cell::Text(s) => parse_text(s),
    }
}

/// Normalize a cell, reporting unparsable values through `notifier`.
pub fn normalize_date(cell: &Cell, notifier: &mut dyn Notifier) -> Option<NaiveDate> {
    match classify(cell) {
        DateOutcome::Date(d) => Some(d),
        DateOutcome::Missing => None,
        DateOutcome::Unparsable(raw) => {
            warn!(value = %raw, "could not parse date");
            notifier.warn(&Warning::new(
                WarningKind::DateParse,
                format!("Could not parse date '{raw}'; treating as missing"),
            ));
            None
        }
    }
}

/// Whether a trimmed text value is one of the placeholder words
pub fn is_sentinel(text: &str) -> bool {
    let upper = text.trim().to_ascii_uppercase();
    SENTINELS.contains(&upper.as_str())
}

fn parse_text(text: &str) -> DateOutcome {
    if is_sentinel(text) {
        return DateOutcome::Missing;
    }
    let trimmed = text.trim();

    for fmt in DATE_FORMATS {
        if let Some(d) = parse_with(trimmed, fmt) {
            return DateOutcome::Date(d);
        }
    }

    match parse_permissive(trimmed) {
        Some(d) => DateOutcome::Date(d),
        None => DateOutcome::Unparsable(trimmed.to_string()),
    }
}

/// Years a spreadsheet can represent; anything else is rejected
fn in_year_range(date: &NaiveDate) -> bool {
    (1000..=9999).contains(&date.year())
}

/// Parse with one format, rejecting years that did not come from four digits
fn parse_with(text: &str, fmt: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, fmt)
        .ok()
        .filter(in_year_range)
}

fn parse_permissive(text: &str) -> Option<NaiveDate> {
    for fmt in FALLBACK_DATETIME_FORMATS {
        if let Some(d) = NaiveDateTime::parse_from_str(text, fmt)
            .ok()
            .map(|dt| dt.date())
            .filter(in_year_range)
        {
            return Some(d);
        }
    }

    if let Some(d) = DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.date_naive())
        .filter(in_year_range)
    {
        return Some(d);
    }

    for fmt in FALLBACK_DATE_FORMATS {
        if let Some(d) = parse_with(text, fmt) {
            return Some(d);
        }
    }

    None
}

/// Convert a spreadsheet serial day number (1900 date system) to a date
pub fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_SERIAL {
        return None;
    }
    // Day 60 is the phantom 1900-02-29; anchoring at 1899-12-30 is exact from day 61 on
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{Level, MemoryNotifier};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn sentinels_are_missing() {
        for s in ["WIP", "wip", " Wip ", "NA", "na", "N/A", "n/a", "", "  "] {
            assert_eq!(classify(&text(s)), DateOutcome::Missing, "sentinel {s:?}");
        }
        assert_eq!(classify(&Cell::Empty), DateOutcome::Missing);
    }

    #[test]
    fn iso_has_priority() {
        assert_eq!(classify(&text("2024-03-05")), DateOutcome::Date(date(2024, 3, 5)));
    }

    #[test]
    fn us_slash_format() {
        assert_eq!(classify(&text("01/02/2024")), DateOutcome::Date(date(2024, 1, 2)));
        assert_eq!(classify(&text("3/7/2024")), DateOutcome::Date(date(2024, 3, 7)));
    }

    #[test]
    fn day_first_dash_format() {
        assert_eq!(classify(&text("25-12-2023")), DateOutcome::Date(date(2023, 12, 25)));
    }

    #[test]
    fn year_first_slash_format() {
        assert_eq!(classify(&text("2024/06/30")), DateOutcome::Date(date(2024, 6, 30)));
    }

    #[test]
    fn fallback_formats() {
        assert_eq!(
            classify(&text("2024-03-05 14:30:00")),
            DateOutcome::Date(date(2024, 3, 5))
        );
        assert_eq!(
            classify(&text("2024-03-05T08:00:00Z")),
            DateOutcome::Date(date(2024, 3, 5))
        );
        assert_eq!(classify(&text("13/01/2024")), DateOutcome::Date(date(2024, 1, 13)));
        assert_eq!(classify(&text("5 March 2024")), DateOutcome::Date(date(2024, 3, 5)));
        assert_eq!(classify(&text("Mar 5, 2024")), DateOutcome::Date(date(2024, 3, 5)));
    }

    #[test]
    fn date_cells_pass_through() {
        let d = date(2025, 1, 31);
        assert_eq!(classify(&Cell::Date(d)), DateOutcome::Date(d));
    }

    #[test]
    fn serial_numbers() {
        assert_eq!(from_serial(45356.0), Some(date(2024, 3, 5)));
        assert_eq!(classify(&Cell::Number(45356.0)), DateOutcome::Date(date(2024, 3, 5)));
        assert_eq!(from_serial(0.0), None);
        assert_eq!(from_serial(f64::NAN), None);
        assert!(matches!(classify(&Cell::Number(-3.0)), DateOutcome::Unparsable(_)));
    }

    #[test]
    fn garbage_is_missing_with_one_warning() {
        let mut notifier = MemoryNotifier::new();
        let result = normalize_date(&text("not-a-date"), &mut notifier);
        assert_eq!(result, None);
        assert_eq!(notifier.count(Level::Warning), 1);
        assert!(notifier.events()[0].1.contains("not-a-date"));
    }

    #[test]
    fn sentinel_does_not_warn() {
        let mut notifier = MemoryNotifier::new();
        assert_eq!(normalize_date(&text("WIP"), &mut notifier), None);
        assert!(notifier.events().is_empty());
    }

    #[test]
    fn short_year_is_not_iso() {
        // "5-3-24" must not become year 5
        let outcome = classify(&text("5-3-24"));
        assert_ne!(outcome, DateOutcome::Date(date(5, 3, 24)));
    }

    #[test]
    fn out_of_range_years_are_unparsable() {
        for raw in [
            "-262143-01-01 00:00:00",
            "-5000-01-01 00:00:00",
            "12345-01-01T00:00:00",
            "-0001-01-01T00:00:00Z",
        ] {
            assert_eq!(
                classify(&text(raw)),
                DateOutcome::Unparsable(raw.to_string()),
                "value {raw:?}"
            );
        }
        assert_eq!(
            classify(&text("2024-03-05 08:30:00")),
            DateOutcome::Date(date(2024, 3, 5))
        );
    }
}
