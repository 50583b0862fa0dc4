//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^in\s+(\d+)\s+(minute|hour)s?$").unwrap());

/// Upper bound for relative times (one week in minutes).
const MAX_RELATIVE_MINUTES: i64 = 7 * 24 * 60;

/// Deadline format used by tasks.
const DEADLINE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Parse a datetime string as either RFC 3339 or a relative future time.
///
/// Supports:
/// - RFC 3339: "2026-01-15T10:30:00Z"
/// - Relative: "in 10 minutes", "in 1 hour"
pub fn parse_datetime(s: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        bail!(
            "Invalid datetime: {s}. Use RFC 3339 (e.g., 2026-01-15T10:30:00Z) or relative (e.g., 'in 10 minutes')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;
    let minutes = match &caps[2] {
        "minute" => n,
        "hour" => n.saturating_mul(60),
        unit => bail!("Unknown time unit: {unit}"),
    };
    if minutes > MAX_RELATIVE_MINUTES {
        bail!("Relative time value too large: {s}");
    }

    Ok(now + Duration::minutes(minutes))
}

/// Parse a calendar day given as `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date: {s}. Use YYYY-MM-DD"))
}

/// Parse a calendar month given as `YYYY-MM` into year and month.
pub fn parse_month(s: &str) -> Result<(i32, u32)> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .with_context(|| format!("Invalid month: {s}. Use YYYY-MM"))?;
    Ok((first.year(), first.month()))
}

/// Validate a task deadline and return it in canonical `YYYY-MM-DD HH:MM` form.
pub fn parse_deadline(s: &str) -> Result<String> {
    let parsed = NaiveDateTime::parse_from_str(s.trim(), DEADLINE_FORMAT)
        .with_context(|| format!("Invalid deadline: {s}. Use 'YYYY-MM-DD HH:MM'"))?;
    Ok(parsed.format(DEADLINE_FORMAT).to_string())
}
