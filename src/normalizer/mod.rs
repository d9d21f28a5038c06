//! Format detection and decoding into the canonical [`Feed`]/[`Entry`] model.
//!
//! The set of formats is closed, so dispatch is a `match` over [`Standard`]
//! with one decoder module per format.

pub mod atom;
pub mod rss1;
pub mod rss2;

use chrono::{DateTime, Utc};
use html_escape::decode_html_entities;
use roxmltree::{Document, Node, ParsingOptions};

use crate::app::{CanopyError, Result};
use crate::domain::{Entry, Feed, Standard};

/// Pick the format of a raw document from its root element.
///
/// Returns `None` for anything that is not one of the three supported
/// formats, including documents that are not well-formed XML. Callers skip
/// such documents rather than failing.
pub fn detect(raw: &[u8]) -> Option<Standard> {
    let doc = parse_document(raw).ok()?;
    match doc.root_element().tag_name().name() {
        "feed" => Some(Standard::Atom),
        "rss" => Some(Standard::Rss20),
        "rdf" | "RDF" => Some(Standard::Rss10),
        _ => None,
    }
}

/// Decode `raw` with the adapter for `standard`.
///
/// Entries come back in document order, which feeds publish newest first.
pub fn decode(standard: Standard, raw: &[u8]) -> Result<(Feed, Vec<Entry>)> {
    match standard {
        Standard::Atom => atom::decode(raw),
        Standard::Rss10 => rss1::decode(raw),
        Standard::Rss20 => rss2::decode(raw),
    }
}

/// Detect and decode in one step. `Ok(None)` means the document was not
/// recognized.
pub fn normalize(raw: &[u8]) -> Result<Option<(Feed, Vec<Entry>)>> {
    match detect(raw) {
        Some(standard) => decode(standard, raw).map(Some),
        None => Ok(None),
    }
}

pub(crate) fn parse_document(raw: &[u8]) -> Result<Document<'_>> {
    let text = std::str::from_utf8(raw).map_err(|e| CanopyError::FeedParse(e.to_string()))?;
    let text = text.trim_start_matches('\u{feff}');
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(text, options).map_err(|e| CanopyError::FeedParse(e.to_string()))
}

pub(crate) fn clean_text(s: &str) -> String {
    decode_html_entities(s.trim()).trim().to_string()
}

pub(crate) fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

pub(crate) fn elements<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

/// Concatenated text of a node, entity-decoded and trimmed. Empty text is `None`.
pub(crate) fn node_text(node: Node<'_, '_>) -> Option<String> {
    let raw: String = node
        .children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    let text = clean_text(&raw);
    (!text.is_empty()).then_some(text)
}

pub(crate) fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    child(node, name).and_then(node_text)
}

pub(crate) fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_rfc2822(s))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_root_element() {
        assert_eq!(
            detect(br#"<feed xmlns="http://www.w3.org/2005/Atom"></feed>"#),
            Some(Standard::Atom)
        );
        assert_eq!(detect(br#"<rss version="2.0"></rss>"#), Some(Standard::Rss20));
        assert_eq!(
            detect(
                br#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"></rdf:RDF>"#
            ),
            Some(Standard::Rss10)
        );
        assert_eq!(detect(b"<rdf></rdf>"), Some(Standard::Rss10));
    }

    #[test]
    fn test_detect_unrecognized() {
        assert_eq!(detect(b"<html><body>nope</body></html>"), None);
        assert_eq!(detect(b"{\"version\": \"https://jsonfeed.org/version/1\"}"), None);
        assert_eq!(detect(b"<rss><channel>"), None);
        assert_eq!(detect(&[0xff, 0xfe, 0x00]), None);
        assert_eq!(detect(b""), None);
    }

    #[test]
    fn test_detect_skips_prolog() {
        let raw = "\u{feff}<?xml version=\"1.0\"?>\n<!-- generated -->\n<rss version=\"2.0\"/>";
        assert_eq!(detect(raw.as_bytes()), Some(Standard::Rss20));
    }

    #[test]
    fn test_normalize_unrecognized_is_none() {
        assert!(normalize(b"<opml/>").unwrap().is_none());
    }

    #[test]
    fn test_parse_date_formats() {
        assert!(parse_date("2024-01-01T00:00:00Z").is_some());
        assert!(parse_date("Mon, 01 Jan 2024 00:00:00 GMT").is_some());
        assert!(parse_date("yesterday").is_none());
    }

    #[test]
    fn test_clean_text_decodes_entities() {
        assert_eq!(clean_text("  Tom &amp; Jerry "), "Tom & Jerry");
    }
}
