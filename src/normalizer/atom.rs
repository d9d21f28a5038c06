use roxmltree::Node;

use crate::app::{CanopyError, Result};
use crate::domain::{Entry, Feed, Standard};
use crate::normalizer::{child_text, elements, parse_date, parse_document};

pub fn decode(raw: &[u8]) -> Result<(Feed, Vec<Entry>)> {
    let doc = parse_document(raw)?;
    let root = doc.root_element();
    if root.tag_name().name() != "feed" {
        return Err(CanopyError::FeedParse(format!(
            "expected <feed>, found <{}>",
            root.tag_name().name()
        )));
    }

    let mut feed = Feed::decoded(Standard::Atom, child_text(root, "title").unwrap_or_default());
    feed.url = link_with_rel(root, "self").unwrap_or_default();
    feed.site_url = alternate_link(root);

    tracing::trace!(id = ?child_text(root, "id"), "decoded atom feed");

    let entries = elements(root, "entry")
        .map(|node| {
            let mut entry = Entry::new(
                alternate_link(node).unwrap_or_default(),
                child_text(node, "title").unwrap_or_default(),
            );
            entry.id = child_text(node, "id");
            entry.summary = child_text(node, "summary");
            entry.updated = child_text(node, "updated")
                .or_else(|| child_text(node, "published"))
                .as_deref()
                .and_then(parse_date);
            entry
        })
        .collect();

    Ok((feed, entries))
}

fn link_with_rel(node: Node<'_, '_>, rel: &str) -> Option<String> {
    elements(node, "link")
        .find(|link| link.attribute("rel") == Some(rel))
        .and_then(|link| link.attribute("href"))
        .map(|href| href.trim().to_string())
}

/// `rel="alternate"` or no rel at all, which Atom treats the same.
/// Falls back to the first link that is not `self`.
fn alternate_link(node: Node<'_, '_>) -> Option<String> {
    elements(node, "link")
        .find(|link| matches!(link.attribute("rel"), None | Some("alternate")))
        .or_else(|| elements(node, "link").find(|link| link.attribute("rel") != Some("self")))
        .and_then(|link| link.attribute("href"))
        .map(|href| href.trim().to_string())
}
