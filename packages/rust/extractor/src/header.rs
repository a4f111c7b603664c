//! Message-header parsing.
//!
//! Each message node carries a metadata header (the `data-pre-plain-text`
//! attribute in chat exports) holding the timestamp and sender. Three header
//! shapes are recognized, tried in order; the first match wins.

use std::sync::LazyLock;

use regex::Regex;

/// `[<timestamp>] <sender>:`
static TS_AND_SENDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\[(?P<ts>[^\]]+)\]\s*(?P<sender>[^:]+):?\s*$").expect("valid regex")
});

/// `[<timestamp>]` alone.
static TS_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[(?P<ts>[^\]]+)\]").expect("valid regex"));

/// Bare leading time token `HH:MM` / `HH.MM`, optional AM/PM.
static BARE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<ts>\d{1,2}[:.]\d{2}(?:\s*(?:AM|PM|am|pm))?)").expect("valid regex")
});

static LEADING_QUOTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:&gt;|>)+\s*").expect("valid regex"));

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n]+").expect("valid regex"));

/// Header metadata pulled from a message node.
#[derive(Debug, Clone, Default)]
pub(crate) struct Header {
    /// The attribute value exactly as it appeared, for prefix-stripping
    /// against the visible text.
    pub raw: Option<String>,
    /// Timestamp portion, when one of the recognized shapes matched.
    pub timestamp: Option<String>,
}

/// Clean a raw header: drop quoting markers and fold line breaks.
pub(crate) fn clean_header(raw: &str) -> String {
    let s = raw.trim();
    let s = LEADING_QUOTES.replace(s, "");
    LINE_BREAKS.replace_all(&s, " ").trim().to_string()
}

/// Parse the header attribute into its timestamp, trying each recognized
/// shape in order. Shapes after the first match are never attempted.
pub(crate) fn parse_header(raw: Option<&str>) -> Header {
    let Some(raw) = raw else {
        return Header::default();
    };

    let cleaned = clean_header(raw);
    let timestamp = [&*TS_AND_SENDER, &*TS_ONLY, &*BARE_TIME]
        .iter()
        .find_map(|re| re.captures(&cleaned))
        .map(|caps| caps["ts"].trim().to_string());

    Header {
        raw: Some(raw.to_string()),
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_and_sender_shape() {
        let header = parse_header(Some("[12/06/2024, 2:45 PM] Priya:"));
        assert_eq!(header.timestamp.as_deref(), Some("12/06/2024, 2:45 PM"));
    }

    #[test]
    fn timestamp_only_shape() {
        // The colon in the trailing text rules out the timestamp+sender shape.
        let header = parse_header(Some("[12/06/2024, 2:45 PM] edited: again later"));
        assert_eq!(header.timestamp.as_deref(), Some("12/06/2024, 2:45 PM"));
    }

    #[test]
    fn bare_time_shape() {
        let header = parse_header(Some("14:32 whatever follows"));
        assert_eq!(header.timestamp.as_deref(), Some("14:32"));

        let header = parse_header(Some("2:45 PM"));
        assert_eq!(header.timestamp.as_deref(), Some("2:45 PM"));
    }

    #[test]
    fn first_matching_shape_wins() {
        // The bracketed shape matches first, so the bare-time shape never
        // sees the "14:00" inside the remainder.
        let header = parse_header(Some("[10:05] 14:00 club:"));
        assert_eq!(header.timestamp.as_deref(), Some("10:05"));
    }

    #[test]
    fn quoting_markers_are_cleaned() {
        let header = parse_header(Some("&gt;&gt; [14:32] Dev Jobs:"));
        assert_eq!(header.timestamp.as_deref(), Some("14:32"));
    }

    #[test]
    fn line_breaks_fold_to_spaces() {
        assert_eq!(clean_header("[14:32]\r\nAnnouncements:"), "[14:32] Announcements:");
    }

    #[test]
    fn missing_or_unrecognized_header() {
        assert!(parse_header(None).timestamp.is_none());
        assert!(parse_header(Some("no timestamp here")).timestamp.is_none());
    }
}
