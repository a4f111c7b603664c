//! Message extraction from exported chat documents.
//!
//! An export is a single HTML document saved from the chat client. Message
//! nodes are located with an ordered list of structural probes; the first
//! probe that yields at least one match wins and later probes are never
//! tried. Each node's metadata header is separated from the visible body,
//! and the header timestamp is normalized to ISO-8601 where possible.

mod header;
mod timestamp;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use jobsift_shared::RawMessage;

pub use timestamp::{normalize_timestamp, strip_directional_marks};

/// Structural probes in priority order. Selection stops at the first probe
/// with at least one matching node.
const MESSAGE_PROBES: &[(&str, &str)] = &[
    ("pre-plain-text", "[data-pre-plain-text]"),
    ("pre-plain-text-underscore", "[data-pre_plain_text]"),
    ("copyable-text", ".copyable-text"),
];

/// Extract all messages from an exported document, in document order.
///
/// Nodes without both usable visible text and a usable raw timestamp are
/// discarded entirely. A document with no recognizable message nodes yields
/// an empty sequence; this function does not fail.
pub fn extract(html: &str) -> Vec<RawMessage> {
    let doc = Html::parse_document(html);

    let Some((probe_name, nodes)) = select_message_nodes(&doc) else {
        debug!("no structural probe matched any node");
        return Vec::new();
    };

    let total = nodes.len();
    let messages: Vec<RawMessage> = nodes.into_iter().filter_map(extract_from_node).collect();

    debug!(
        probe = probe_name,
        matched = total,
        kept = messages.len(),
        "extraction complete"
    );

    messages
}

/// Run the probes in order; return the first probe's matches.
fn select_message_nodes<'a>(doc: &'a Html) -> Option<(&'static str, Vec<ElementRef<'a>>)> {
    for &(name, selector_str) in MESSAGE_PROBES {
        let selector = Selector::parse(selector_str).expect("valid probe selector");
        let nodes: Vec<ElementRef<'a>> = doc.select(&selector).collect();
        if !nodes.is_empty() {
            debug!(probe = name, matches = nodes.len(), "probe matched");
            return Some((name, nodes));
        }
    }
    None
}

/// Pull one message out of a matched node, or discard it.
fn extract_from_node(el: ElementRef<'_>) -> Option<RawMessage> {
    let pre = el
        .value()
        .attr("data-pre-plain-text")
        .or_else(|| el.value().attr("data-pre_plain_text"));

    let header = header::parse_header(pre);

    let mut visible = collect_text(el);

    // The header is sometimes duplicated at the start of the visible text;
    // strip that exact prefix so it does not pollute the message body.
    if let Some(raw) = header.raw.as_deref() {
        let raw = raw.trim();
        if !raw.is_empty() && visible.starts_with(raw) {
            visible = visible[raw.len()..].trim_start().to_string();
        }
    }

    let Some(timestamp_raw) = header.timestamp else {
        debug!("node discarded: no usable timestamp");
        return None;
    };
    if visible.is_empty() {
        debug!("node discarded: no usable text");
        return None;
    }

    let timestamp_iso = timestamp::normalize_timestamp(&timestamp_raw);
    if timestamp_iso.is_none() {
        warn!(raw = %timestamp_raw, "timestamp not normalizable, keeping raw");
    }

    Some(RawMessage {
        text: visible,
        timestamp_raw,
        timestamp_iso,
    })
}

/// Collect a node's visible text, whitespace-joined and collapsed.
fn collect_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
