//! Registration, deduplication and lifecycle of folders, feeds and entries.
//!
//! The registry is the only writer of tree shape. It keeps the invariants the
//! store alone cannot express: one root per owner, non-root folders always
//! linked under a parent, and cascading removal of whole subtrees.

use std::sync::Arc;

use crate::app::{CanopyError, Result};
use crate::domain::folder::ROOT_TITLE;
use crate::domain::{ChildKey, Entry, EntryKey, Feed, FeedKey, Folder, FolderKey, Node};
use crate::store::{FeedInsert, Store};

/// Result of [`Registry::register_feed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedRegistration {
    /// The new feed, or the existing one when `duplicated` is set.
    pub key: FeedKey,
    pub duplicated: bool,
}

pub struct Registry<S> {
    store: Arc<S>,
}

impl<S> Clone for Registry<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Store> Registry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn folder(&self, key: FolderKey) -> Result<Folder> {
        self.store
            .get_folder(key)?
            .ok_or(CanopyError::FolderNotFound(key))
    }

    pub fn feed(&self, key: FeedKey) -> Result<Feed> {
        self.store.get_feed(key)?.ok_or(CanopyError::FeedNotFound(key))
    }

    pub fn entry(&self, key: EntryKey) -> Result<Entry> {
        self.store
            .get_entry(key)?
            .ok_or_else(|| CanopyError::entry_not_found(key))
    }

    pub fn root_folders(&self) -> Result<Vec<FolderKey>> {
        self.store.root_folders()
    }

    /// The owner's root folder, created on first use.
    pub fn ensure_root(&self, owner: &str) -> Result<FolderKey> {
        if let Some((key, _)) = self.store.find_root_folder(owner)? {
            return Ok(key);
        }

        match self.register_folder(owner, ROOT_TITLE, true, None) {
            Ok(key) => Ok(key),
            // Lost a race with another first visit.
            Err(CanopyError::RootExists(_)) => self
                .store
                .find_root_folder(owner)?
                .map(|(key, _)| key)
                .ok_or_else(|| CanopyError::RootExists(owner.to_string())),
            Err(e) => Err(e),
        }
    }

    pub fn register_folder(
        &self,
        owner: &str,
        title: &str,
        is_root: bool,
        parent: Option<FolderKey>,
    ) -> Result<FolderKey> {
        let folder = if is_root {
            let mut folder = Folder::root(owner);
            folder.title = title.to_string();
            folder
        } else {
            let parent = parent.ok_or(CanopyError::MissingParent)?;
            Folder::new(owner, title, parent)
        };

        let key = self.store.insert_folder(&folder)?;
        tracing::debug!(%key, owner, title, is_root, "registered folder");
        Ok(key)
    }

    /// Register a decoded feed under `target`, deduplicated by (owner, url).
    ///
    /// On a duplicate nothing is written and the existing feed's key is
    /// returned. Otherwise the feed is linked into `target` and its entries
    /// are registered, which sets the watermark.
    pub fn register_feed(
        &self,
        owner: &str,
        mut feed: Feed,
        entries: &[Entry],
        target: FolderKey,
    ) -> Result<FeedRegistration> {
        feed.owner = owner.to_string();
        feed.parent = Some(target);
        feed.entries.clear();
        feed.final_entry = None;

        match self.store.insert_feed(&feed)? {
            FeedInsert::Duplicate(key) => {
                tracing::info!(%key, owner, url = %feed.url, "feed already registered");
                Ok(FeedRegistration {
                    key,
                    duplicated: true,
                })
            }
            FeedInsert::Created(key) => {
                tracing::info!(%key, owner, url = %feed.url, standard = %feed.standard, "registered feed");
                self.register_entries(entries, key)?;
                Ok(FeedRegistration {
                    key,
                    duplicated: false,
                })
            }
        }
    }

    /// Persist `entries` (newest first) for `feed` and prepend their keys.
    ///
    /// Each entry is written on its own; a failed write is logged and the
    /// rest are kept. The watermark moves to the newest persisted entry. Only
    /// persisted entries are returned, paired with their keys. An empty input
    /// changes nothing.
    pub fn register_entries(
        &self,
        entries: &[Entry],
        feed: FeedKey,
    ) -> Result<Vec<(EntryKey, Entry)>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let owner = self.feed(feed)?.owner;

        let mut stored = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut entry = entry.clone();
            entry.owner = owner.clone();
            match self.store.insert_entry(feed, &entry) {
                Ok(key) => stored.push((key, entry)),
                Err(e) => {
                    tracing::warn!(%feed, link = %entry.link, error = %e, "failed to store entry");
                }
            }
        }

        if stored.is_empty() {
            return Ok(stored);
        }
        let keys: Vec<EntryKey> = stored.iter().map(|(key, _)| *key).collect();
        let newest = stored[0].1.identity();

        match self.store.prepend_entries(feed, &keys, Some(newest)) {
            Ok(()) => {
                tracing::debug!(%feed, count = keys.len(), "registered entries");
                Ok(stored)
            }
            Err(CanopyError::FeedNotFound(_)) => {
                tracing::warn!(%feed, "feed vanished while registering entries");
                self.store.delete_entries(&keys)?;
                Err(CanopyError::FeedNotFound(feed))
            }
            Err(e) => Err(e),
        }
    }

    pub fn rename_folder(&self, key: FolderKey, title: &str) -> Result<()> {
        self.store.rename_folder(key, title)
    }

    pub fn rename_feed(&self, key: FeedKey, title: &str) -> Result<()> {
        self.store.rename_feed(key, title)
    }

    /// Remove a non-root folder with every folder, feed and entry below it.
    pub fn remove_folder(&self, key: FolderKey) -> Result<()> {
        let folder = self.folder(key)?;
        if folder.is_root() {
            return Err(CanopyError::RootFolder(key));
        }

        let folders = self.store.delete_folder_tree(key)?;
        tracing::info!(%key, title = %folder.title, folders, "removed folder");
        Ok(())
    }

    pub fn remove_feed(&self, key: FeedKey) -> Result<()> {
        let feed = self.feed(key)?;
        if let Some(parent) = feed.parent {
            self.detach(parent, ChildKey::Feed(key))?;
        }
        self.store.delete_feed(key)?;

        tracing::info!(%key, url = %feed.url, "removed feed");
        Ok(())
    }

    /// Detach from a parent that may already be gone.
    fn detach(&self, parent: FolderKey, child: ChildKey) -> Result<()> {
        match self.store.detach_child(parent, child) {
            Err(CanopyError::FolderNotFound(_)) => {
                tracing::warn!(%parent, %child, "parent folder missing on detach");
                Ok(())
            }
            other => other,
        }
    }

    /// Mark one entry read, which deletes it.
    pub fn read_entry(&self, feed: FeedKey, entry: EntryKey) -> Result<()> {
        if self.store.remove_feed_entries(feed, &[entry])? == 0 {
            return Err(CanopyError::entry_not_found(entry));
        }
        Ok(())
    }

    pub fn read_entry_by_link(&self, feed: FeedKey, link: &str) -> Result<EntryKey> {
        let entry = self
            .store
            .find_entry_by_link(feed, link)?
            .ok_or_else(|| CanopyError::EntryNotFound(link.to_string()))?;
        self.read_entry(feed, entry)?;
        Ok(entry)
    }

    /// Delete every entry of the feed. The watermark is kept so the same
    /// items are not delivered again.
    pub fn read_feed(&self, feed: FeedKey) -> Result<usize> {
        let keys = self.feed(feed)?.entries;
        if keys.is_empty() {
            return Ok(0);
        }
        self.store.remove_feed_entries(feed, &keys)
    }

    pub fn read_folder(&self, folder: FolderKey) -> Result<usize> {
        let mut total = 0;
        for feed in self.subtree_feeds(folder)? {
            total += self.read_feed(feed)?;
        }
        Ok(total)
    }

    pub fn entry_count(&self, folder: FolderKey) -> Result<usize> {
        let mut total = 0;
        for key in self.subtree_feeds(folder)? {
            if let Some(feed) = self.store.get_feed(key)? {
                total += feed.entries.len();
            }
        }
        Ok(total)
    }

    /// Children of `folder` in order. Keys whose record is gone are skipped.
    pub fn children(&self, folder: FolderKey) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        for child in self.folder(folder)?.children {
            let node = match child {
                ChildKey::Folder(key) => self.store.get_folder(key)?.map(|f| Node::Folder(key, f)),
                ChildKey::Feed(key) => self.store.get_feed(key)?.map(|f| Node::Feed(key, f)),
            };
            match node {
                Some(node) => nodes.push(node),
                None => tracing::debug!(%folder, %child, "skipping dangling child"),
            }
        }
        Ok(nodes)
    }

    /// Entries of a feed, newest first.
    pub fn entries(&self, feed: FeedKey) -> Result<Vec<(EntryKey, Entry)>> {
        let mut entries = Vec::new();
        for key in self.feed(feed)?.entries {
            if let Some(entry) = self.store.get_entry(key)? {
                entries.push((key, entry));
            }
        }
        Ok(entries)
    }

    /// Every feed below `folder`, found with an explicit worklist.
    fn subtree_feeds(&self, folder: FolderKey) -> Result<Vec<FeedKey>> {
        let mut feeds = Vec::new();
        let mut pending = vec![self.folder(folder)?];
        while let Some(current) = pending.pop() {
            for child in current.children {
                match child {
                    ChildKey::Feed(key) => feeds.push(key),
                    ChildKey::Folder(key) => {
                        if let Some(sub) = self.store.get_folder(key)? {
                            pending.push(sub);
                        }
                    }
                }
            }
        }
        Ok(feeds)
    }
}
