use crate::app::{CanopyError, Result};
use crate::domain::{Entry, Feed, Standard};
use crate::normalizer::{child, child_text, elements, parse_date, parse_document};

/// RSS 1.0 items have no identifier of their own; the link stands in for one.
pub fn decode(raw: &[u8]) -> Result<(Feed, Vec<Entry>)> {
    let doc = parse_document(raw)?;
    let root = doc.root_element();
    let channel = child(root, "channel")
        .ok_or_else(|| CanopyError::FeedParse("RSS 1.0 document has no channel".into()))?;

    let mut feed = Feed::decoded(
        Standard::Rss10,
        child_text(channel, "title").unwrap_or_default(),
    );
    feed.url = channel
        .attributes()
        .find(|attr| attr.name() == "about")
        .map(|attr| attr.value().trim().to_string())
        .unwrap_or_default();
    feed.site_url = child_text(channel, "link");

    let entries = elements(root, "item")
        .map(|item| {
            let mut entry = Entry::new(
                child_text(item, "link").unwrap_or_default(),
                child_text(item, "title").unwrap_or_default(),
            );
            entry.summary = child_text(item, "description");
            entry.updated = child_text(item, "date").as_deref().and_then(parse_date);
            entry
        })
        .collect();

    Ok((feed, entries))
}
