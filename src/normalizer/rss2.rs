use crate::app::{CanopyError, Result};
use crate::domain::{Entry, Feed, Standard};
use crate::normalizer::{child, child_text, elements, node_text, parse_date, parse_document};

pub fn decode(raw: &[u8]) -> Result<(Feed, Vec<Entry>)> {
    let doc = parse_document(raw)?;
    let channel = child(doc.root_element(), "channel")
        .ok_or_else(|| CanopyError::FeedParse("RSS 2.0 document has no channel".into()))?;

    let mut feed = Feed::decoded(
        Standard::Rss20,
        child_text(channel, "title").unwrap_or_default(),
    );

    // <link>text</link> is the site; <atom:link href=".." rel="self"/> is the feed itself.
    for link in elements(channel, "link") {
        match (link.attribute("href"), link.attribute("rel")) {
            (Some(href), None | Some("self")) => {
                if feed.url.is_empty() {
                    feed.url = href.trim().to_string();
                }
            }
            (Some(href), Some("alternate")) => {
                if feed.site_url.is_none() {
                    feed.site_url = Some(href.trim().to_string());
                }
            }
            (Some(_), Some(_)) => {}
            (None, _) => {
                if feed.site_url.is_none() {
                    feed.site_url = node_text(link);
                }
            }
        }
    }

    let entries = elements(channel, "item")
        .map(|item| {
            let link = elements(item, "link")
                .filter(|l| l.attribute("href").is_none())
                .find_map(node_text)
                .unwrap_or_default();
            let mut entry = Entry::new(link, child_text(item, "title").unwrap_or_default());
            entry.id = child_text(item, "guid");
            entry.summary = child_text(item, "description");
            entry.updated = child_text(item, "pubDate")
                .or_else(|| child_text(item, "date"))
                .as_deref()
                .and_then(parse_date);
            entry
        })
        .collect();

    Ok((feed, entries))
}
