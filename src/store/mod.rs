pub mod sqlite;

use crate::app::Result;
use crate::domain::{ChildKey, Entry, EntryKey, Feed, FeedKey, Folder, FolderKey};

pub use sqlite::SqliteStore;

/// Outcome of inserting a feed under the (owner, url) uniqueness rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedInsert {
    Created(FeedKey),
    /// The owner already subscribes to this url; nothing was written.
    Duplicate(FeedKey),
}

/// Entity store for folders, feeds and entries.
///
/// Every method that edits a key list (`children`, `entries`) does the
/// read-modify-write atomically on that single record.
pub trait Store {
    // Folder operations

    /// Insert a folder. A non-root folder is appended to its parent's children
    /// in the same transaction.
    fn insert_folder(&self, folder: &Folder) -> Result<FolderKey>;
    fn get_folder(&self, key: FolderKey) -> Result<Option<Folder>>;
    fn find_root_folder(&self, owner: &str) -> Result<Option<(FolderKey, Folder)>>;
    fn root_folders(&self) -> Result<Vec<FolderKey>>;
    fn rename_folder(&self, key: FolderKey, title: &str) -> Result<()>;
    fn detach_child(&self, parent: FolderKey, child: ChildKey) -> Result<()>;
    /// Detach the folder from its parent and delete it together with every
    /// folder, feed and entry below it, in one transaction. Returns the number
    /// of folders deleted.
    fn delete_folder_tree(&self, key: FolderKey) -> Result<usize>;

    // Feed operations

    fn find_feed(&self, owner: &str, url: &str) -> Result<Option<FeedKey>>;
    /// Check for an existing (owner, url) pair, insert the feed and append it
    /// to its parent's children, all in one transaction.
    fn insert_feed(&self, feed: &Feed) -> Result<FeedInsert>;
    fn get_feed(&self, key: FeedKey) -> Result<Option<Feed>>;
    fn rename_feed(&self, key: FeedKey, title: &str) -> Result<()>;
    /// Put `keys` in front of the feed's entry list and, if given, move the
    /// watermark.
    fn prepend_entries(
        &self,
        feed: FeedKey,
        keys: &[EntryKey],
        final_entry: Option<&str>,
    ) -> Result<()>;
    /// Delete entries belonging to `feed` and drop them from its list.
    fn remove_feed_entries(&self, feed: FeedKey, keys: &[EntryKey]) -> Result<usize>;
    /// Delete the feed record and every entry row attached to it.
    fn delete_feed(&self, key: FeedKey) -> Result<()>;

    // Entry operations

    fn insert_entry(&self, feed: FeedKey, entry: &Entry) -> Result<EntryKey>;
    fn get_entry(&self, key: EntryKey) -> Result<Option<Entry>>;
    fn find_entry_by_link(&self, feed: FeedKey, link: &str) -> Result<Option<EntryKey>>;
    fn delete_entries(&self, keys: &[EntryKey]) -> Result<usize>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use super::{FeedInsert, SqliteStore, Store};
    use crate::app::{CanopyError, Result};
    use crate::domain::{ChildKey, Entry, EntryKey, Feed, FeedKey, Folder, FolderKey};

    /// A store that can fail one entry write, or drop the feed right before
    /// its entry list is updated.
    pub struct FlakyStore {
        pub inner: SqliteStore,
        pub fail_link: Option<String>,
        pub drop_feed_on_prepend: AtomicBool,
        pub deleted_entries: Mutex<Vec<EntryKey>>,
    }

    impl FlakyStore {
        pub fn new() -> Self {
            Self {
                inner: SqliteStore::in_memory().unwrap(),
                fail_link: None,
                drop_feed_on_prepend: AtomicBool::new(false),
                deleted_entries: Mutex::new(Vec::new()),
            }
        }
    }

    impl Store for FlakyStore {
        fn insert_folder(&self, folder: &Folder) -> Result<FolderKey> {
            self.inner.insert_folder(folder)
        }
        fn get_folder(&self, key: FolderKey) -> Result<Option<Folder>> {
            self.inner.get_folder(key)
        }
        fn find_root_folder(&self, owner: &str) -> Result<Option<(FolderKey, Folder)>> {
            self.inner.find_root_folder(owner)
        }
        fn root_folders(&self) -> Result<Vec<FolderKey>> {
            self.inner.root_folders()
        }
        fn rename_folder(&self, key: FolderKey, title: &str) -> Result<()> {
            self.inner.rename_folder(key, title)
        }
        fn detach_child(&self, parent: FolderKey, child: ChildKey) -> Result<()> {
            self.inner.detach_child(parent, child)
        }
        fn delete_folder_tree(&self, key: FolderKey) -> Result<usize> {
            self.inner.delete_folder_tree(key)
        }
        fn find_feed(&self, owner: &str, url: &str) -> Result<Option<FeedKey>> {
            self.inner.find_feed(owner, url)
        }
        fn insert_feed(&self, feed: &Feed) -> Result<FeedInsert> {
            self.inner.insert_feed(feed)
        }
        fn get_feed(&self, key: FeedKey) -> Result<Option<Feed>> {
            self.inner.get_feed(key)
        }
        fn rename_feed(&self, key: FeedKey, title: &str) -> Result<()> {
            self.inner.rename_feed(key, title)
        }
        fn prepend_entries(
            &self,
            feed: FeedKey,
            keys: &[EntryKey],
            final_entry: Option<&str>,
        ) -> Result<()> {
            if self.drop_feed_on_prepend.load(Ordering::SeqCst) {
                self.inner.delete_feed(feed)?;
            }
            self.inner.prepend_entries(feed, keys, final_entry)
        }
        fn remove_feed_entries(&self, feed: FeedKey, keys: &[EntryKey]) -> Result<usize> {
            self.inner.remove_feed_entries(feed, keys)
        }
        fn delete_feed(&self, key: FeedKey) -> Result<()> {
            self.inner.delete_feed(key)
        }
        fn insert_entry(&self, feed: FeedKey, entry: &Entry) -> Result<EntryKey> {
            if self.fail_link.as_deref() == Some(entry.link.as_str()) {
                return Err(CanopyError::Other("disk full".into()));
            }
            self.inner.insert_entry(feed, entry)
        }
        fn get_entry(&self, key: EntryKey) -> Result<Option<Entry>> {
            self.inner.get_entry(key)
        }
        fn find_entry_by_link(&self, feed: FeedKey, link: &str) -> Result<Option<EntryKey>> {
            self.inner.find_entry_by_link(feed, link)
        }
        fn delete_entries(&self, keys: &[EntryKey]) -> Result<usize> {
            self.deleted_entries.lock().unwrap().extend_from_slice(keys);
            self.inner.delete_entries(keys)
        }
    }
}
