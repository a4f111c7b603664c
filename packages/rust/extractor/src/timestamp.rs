//! Timestamp normalization for message headers.
//!
//! Chat exports carry timestamps in whatever locale the exporting client was
//! set to. Normalization attempts a tolerant parse twice — first assuming
//! month-before-day, then day-before-month — and emits ISO-8601 from the
//! first attempt that yields a result. Unparseable input is left to the
//! caller, which retains the raw string.

use chrono::{NaiveDate, NaiveDateTime};

/// Date component order for ambiguous numeric dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateOrder {
    MonthFirst,
    DayFirst,
}

/// Formats that carry no day/month ambiguity, tried before the ordered sets.
const FIXED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d",
    "%B %d %Y %I:%M %p",
    "%B %d %Y %H:%M",
    "%B %d %Y",
    "%d %B %Y %H:%M",
    "%d %B %Y",
    "%b %d %Y %I:%M %p",
    "%b %d %Y %H:%M",
    "%b %d %Y",
    "%d %b %Y %H:%M",
    "%d %b %Y",
];

/// Normalize a raw header timestamp to ISO-8601 (`YYYY-MM-DDTHH:MM:SS`).
///
/// Strips bidirectional control marks first. Returns `None` when no supported
/// shape matches — including bare time-of-day tokens, which carry no date and
/// are retained raw by the extractor.
pub fn normalize_timestamp(raw: &str) -> Option<String> {
    let cleaned = strip_directional_marks(raw);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }

    // Month-first is attempted first; its result wins for ambiguous dates.
    for order in [DateOrder::MonthFirst, DateOrder::DayFirst] {
        if let Some(dt) = parse_with_order(cleaned, order) {
            return Some(dt.format("%Y-%m-%dT%H:%M:%S").to_string());
        }
    }

    None
}

/// Remove Unicode bidirectional marks that chat clients embed around times.
pub fn strip_directional_marks(s: &str) -> String {
    s.chars().filter(|c| !matches!(c, '\u{200e}' | '\u{200f}')).collect()
}

fn parse_with_order(s: &str, order: DateOrder) -> Option<NaiveDateTime> {
    let prepared = prepare(s);

    for fmt in FIXED_FORMATS {
        if let Some(dt) = try_format(&prepared, fmt) {
            return Some(dt);
        }
    }

    // Ordered numeric dates: try the string as written, then with dashes and
    // dots folded to slashes so "12-06-2024" and "12.06.2024" parse too.
    let slashed = prepared.replace(['-', '.'], "/");
    let mut candidates = vec![prepared.clone()];
    if slashed != prepared {
        candidates.push(slashed);
    }

    for candidate in &candidates {
        for fmt in ordered_formats(order) {
            if let Some(dt) = try_format(candidate, &fmt) {
                return Some(dt);
            }
        }
    }

    None
}

/// Fold commas into spaces and collapse whitespace runs.
fn prepare(s: &str) -> String {
    s.replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn ordered_formats(order: DateOrder) -> Vec<String> {
    // %y before %Y: two-digit years would otherwise parse as literal year
    // 0024. A four-digit year never fully matches a %y format, so the
    // ordering is safe for both widths.
    let dates: &[&str] = match order {
        DateOrder::MonthFirst => &["%m/%d/%y", "%m/%d/%Y"],
        DateOrder::DayFirst => &["%d/%m/%y", "%d/%m/%Y"],
    };
    let times = ["%I:%M:%S %p", "%I:%M %p", "%H:%M:%S", "%H:%M"];

    let mut formats = Vec::new();
    for date in dates {
        // Exports place the time on either side of the date.
        for time in times {
            formats.push(format!("{date} {time}"));
            formats.push(format!("{time} {date}"));
        }
        formats.push((*date).to_string());
    }
    formats
}

fn try_format(s: &str, fmt: &str) -> Option<NaiveDateTime> {
    let has_time = fmt.contains("%H") || fmt.contains("%I");
    if has_time {
        NaiveDateTime::parse_from_str(s, fmt).ok()
    } else {
        NaiveDate::parse_from_str(s, fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }
}
