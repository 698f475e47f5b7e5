//! Stateless formatting and validation helpers used by the UI.

use chrono::DateTime;
use regex::Regex;
use std::sync::LazyLock;

static ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("static regex"));

/// True iff `input` is exactly `0x` followed by 40 hex digits.
pub fn is_valid_address(input: &str) -> bool {
    ADDRESS_RE.is_match(input)
}

/// Shorten a long string to `head…tail`.
pub fn shorten(s: &str, head: usize, tail: usize) -> String {
    if !s.is_ascii() || s.len() <= head + tail + 1 {
        s.to_string()
    } else {
        format!("{}\u{2026}{}", &s[..head], &s[s.len() - tail..])
    }
}

/// `0x1234…abcd` form used in cards and tables.
pub fn short_address(address: &str) -> String {
    shorten(address, 6, 4)
}

/// Cut a decimal string to at most `max_fraction` fractional digits and strip
/// trailing zeros: `"1.500000"` → `"1.5"`, `"2.000"` → `"2"`.
pub fn trim_decimal(value: &str, max_fraction: usize) -> String {
    let Some((int_part, frac_part)) = value.split_once('.') else {
        return value.to_string();
    };
    let frac: String = frac_part.chars().take(max_fraction).collect();
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac}")
    }
}

/// Group the integer part with thousands separators: `"1234567.5"` → `"1,234,567.5"`.
pub fn group_thousands(value: &str) -> String {
    let (sign, rest) = match value.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", value),
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rest, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (index, ch) in int_part.chars().enumerate() {
        if index > 0 && (int_part.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Render a unix timestamp (seconds) as `dd.mm.yyyy HH:MM` UTC; `0` renders as a dash.
pub fn format_timestamp(seconds: u64) -> String {
    if seconds == 0 {
        return "\u{2014}".to_string();
    }
    i64::try_from(seconds)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%d.%m.%Y %H:%M").to_string())
        .unwrap_or_else(|| "\u{2014}".to_string())
}

/// Countdown such as `12d 04h 30m`.
pub fn format_countdown(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    format!("{days}d {hours:02}h {minutes:02}m")
}
