//! Locale-invariant canonical field formats.
//!
//! Every byte that goes into a hash, a signature, or a persisted row passes
//! through these functions. They must stay byte-for-byte stable: changing
//! any of them changes every stored hash.

use chrono::{Local, NaiveDateTime, Timelike};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::TypeError;

/// Separator used when joining tags into their canonical string form.
pub const TAG_SEPARATOR: &str = ",";

/// Canonical timestamp format: month and day unpadded, 24-hour clock,
/// second precision, no timezone offset.
const TIMESTAMP_FORMAT: &str = "%-m/%-d/%Y %H:%M:%S";

/// Maximum fractional digits an amount carries in canonical form.
const AMOUNT_SCALE: u32 = 8;

/// Format an amount as a fixed-point decimal string: up to 8 fractional
/// digits, no trailing zeros, no grouping separators, `.` decimal point,
/// leading `-` for payments. Midpoints round away from zero.
pub fn format_amount(amount: Decimal) -> String {
    amount
        .round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
        .to_string()
}

/// Parse an amount from its canonical string form.
pub fn parse_amount(s: &str) -> Result<Decimal, TypeError> {
    s.parse::<Decimal>()
        .map_err(|e| TypeError::InvalidAmount(format!("{s:?}: {e}")))
}

/// Format a timestamp as `M/d/yyyy HH:mm:ss`.
pub fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp from its canonical string form.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, TypeError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map_err(|e| TypeError::InvalidTimestamp(format!("{s:?}: {e}")))
}

/// Current local time truncated to whole seconds. Sub-second information is
/// never part of canonical form and is discarded at entry creation.
pub fn now_truncated() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Join tags in stored order with the canonical separator.
pub fn join_tags(tags: &[String]) -> String {
    tags.join(TAG_SEPARATOR)
}

/// Split a persisted tag string back into a tag list. An empty string is an
/// empty list; both join back to identical canonical bytes.
pub fn split_tags(s: &str) -> Vec<String> {
    if s.is_empty() {
        Vec::new()
    } else {
        s.split(TAG_SEPARATOR).map(str::to_string).collect()
    }
}
