//! Epoch and human-readable timestamp conversions.
//!
//! Human-readable timestamps are always UTC and minute-resolution, e.g.
//! `Tue, 29 Nov 2016 13:57`. Output files use [`NOT_AVAILABLE`] for a
//! timestamp that does not exist (a TODO that was never deleted).

use chrono::{DateTime, NaiveDateTime};

use crate::error::LensError;

/// Format of every human-readable timestamp written or read by todolens.
pub const HUMAN_FORMAT: &str = "%a, %d %b %Y %H:%M";

/// Placeholder for a missing timestamp.
pub const NOT_AVAILABLE: &str = "N/A";

/// Seconds in one day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Render epoch seconds as a human-readable UTC timestamp.
///
/// # Examples
///
/// ```
/// use todolens_core::clock::human_readable;
///
/// assert_eq!(human_readable(Some(1480427844)), "Tue, 29 Nov 2016 13:57");
/// assert_eq!(human_readable(None), "N/A");
/// ```
pub fn human_readable(epoch: Option<i64>) -> String {
    epoch
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format(HUMAN_FORMAT).to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Parse a human-readable UTC timestamp back into epoch seconds.
///
/// # Errors
///
/// Returns [`LensError::Timestamp`] if `value` does not match [`HUMAN_FORMAT`].
///
/// # Examples
///
/// ```
/// use todolens_core::clock::epoch_from_human_readable;
///
/// assert_eq!(epoch_from_human_readable("Tue, 29 Nov 2016 13:57").unwrap(), 1480427820);
/// assert!(epoch_from_human_readable("yesterday").is_err());
/// ```
pub fn epoch_from_human_readable(value: &str) -> Result<i64, LensError> {
    NaiveDateTime::parse_from_str(value.trim(), HUMAN_FORMAT)
        .map(|dt| dt.and_utc().timestamp())
        .map_err(|e| LensError::Timestamp(format!("'{value}' is not '{HUMAN_FORMAT}': {e}")))
}

/// Parse `value`, falling back to `fallback` when `value` is missing.
///
/// A missing value is empty or [`NOT_AVAILABLE`]. When both are missing the
/// result is `0`.
///
/// # Errors
///
/// Returns [`LensError::Timestamp`] if the timestamp that is used is malformed.
pub fn epoch_or_fallback(value: &str, fallback: &str) -> Result<i64, LensError> {
    if !is_missing(value) {
        epoch_from_human_readable(value)
    } else if !is_missing(fallback) {
        epoch_from_human_readable(fallback)
    } else {
        Ok(0)
    }
}

/// Whether a timestamp cell is empty or [`NOT_AVAILABLE`].
pub fn is_missing(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == NOT_AVAILABLE
}

/// Fractional days from `earlier` to `later`.
///
/// # Examples
///
/// ```
/// use todolens_core::clock::day_diff;
///
/// assert_eq!(day_diff(0, 129_600), 1.5);
/// ```
pub fn day_diff(earlier: i64, later: i64) -> f64 {
    (later - earlier) as f64 / SECONDS_PER_DAY
}
