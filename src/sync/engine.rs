use std::sync::Arc;

use url::Url;

use crate::app::{CanopyError, Result};
use crate::domain::{Entry, Feed, FeedKey, FolderKey};
use crate::fetcher::Fetcher;
use crate::normalizer;
use crate::registry::{FeedRegistration, Registry};
use crate::store::Store;

/// Entries newer than `watermark`, newest first.
///
/// Scanning stops at the first entry whose identity equals the watermark.
/// When the watermark is unset or no longer in the list, every entry counts
/// as new.
pub fn entries_since(mut entries: Vec<Entry>, watermark: Option<&str>) -> Vec<Entry> {
    if let Some(mark) = watermark {
        if let Some(pos) = entries.iter().position(|e| e.identity() == mark) {
            entries.truncate(pos);
        }
    }
    entries
}

pub struct SyncEngine<S> {
    registry: Registry<S>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
}

impl<S: Store> SyncEngine<S> {
    pub fn new(registry: Registry<S>, fetcher: Arc<dyn Fetcher + Send + Sync>) -> Self {
        Self { registry, fetcher }
    }

    pub fn registry(&self) -> &Registry<S> {
        &self.registry
    }

    /// Bring one feed up to date and return the new entries that were stored.
    pub async fn update_feed(&self, key: FeedKey) -> Result<Vec<Entry>> {
        let feed = self.registry.feed(key)?;
        let raw = self.fetcher.fetch(&feed.url).await?;

        let live = normalizer::detect(&raw)
            .ok_or_else(|| CanopyError::UnrecognizedFormat(feed.url.clone()))?;
        if live != feed.standard {
            tracing::warn!(
                %key,
                url = %feed.url,
                stored = %feed.standard,
                live = %live,
                "feed format changed, decoding with the stored format"
            );
        }

        let (_, entries) = normalizer::decode(feed.standard, &raw)?;
        let fresh = entries_since(entries, feed.final_entry.as_deref());

        let stored = self.registry.register_entries(&fresh, key)?;
        tracing::info!(
            %key,
            url = %feed.url,
            new = fresh.len(),
            stored = stored.len(),
            "feed updated"
        );

        Ok(stored.into_iter().map(|(_, entry)| entry).collect())
    }

    /// [`update_feed`](Self::update_feed) for user-triggered refreshes:
    /// failures are logged and produce no entries.
    pub async fn refresh(&self, key: FeedKey) -> Vec<Entry> {
        match self.update_feed(key).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(%key, error = %e, "feed refresh failed");
                Vec::new()
            }
        }
    }

    /// Fetch and decode a document. `Ok(None)` when it is not a feed.
    pub async fn fetch_document(&self, url: &str) -> Result<Option<(Feed, Vec<Entry>)>> {
        let raw = self.fetcher.fetch(url).await?;
        normalizer::normalize(&raw)
    }

    /// Subscribe `owner` to the feed at `url` under `target`.
    ///
    /// Returns `Ok(None)` when the document is not a recognized feed.
    pub async fn subscribe(
        &self,
        owner: &str,
        url: &str,
        target: FolderKey,
    ) -> Result<Option<FeedRegistration>> {
        self.subscribe_with(owner, url, target, None, None).await
    }

    /// Like [`subscribe`](Self::subscribe), with an optional title used when
    /// the document has none and a site url that replaces the document's.
    pub(crate) async fn subscribe_with(
        &self,
        owner: &str,
        url: &str,
        target: FolderKey,
        title: Option<&str>,
        site_url: Option<&str>,
    ) -> Result<Option<FeedRegistration>> {
        let url = url.trim();
        Url::parse(url)?;

        let Some((mut feed, entries)) = self.fetch_document(url).await? else {
            tracing::info!(url, "not a recognized feed document");
            return Ok(None);
        };

        feed.url = url.to_string();
        if feed.title.is_empty() {
            if let Some(title) = title {
                feed.title = title.to_string();
            }
        }
        if let Some(site_url) = site_url {
            feed.site_url = Some(site_url.to_string());
        }

        self.registry
            .register_feed(owner, feed, &entries, target)
            .map(Some)
    }
}
