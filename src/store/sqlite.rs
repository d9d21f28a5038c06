use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use rusqlite_migration::{Migrations, M};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::app::{CanopyError, Result};
use crate::domain::{ChildKey, Entry, EntryKey, Feed, FeedKey, Folder, FolderKind, FolderKey};
use crate::store::{FeedInsert, Store};

const FOLDER_COLUMNS: &str = "id, kind, title, owner, parent, children";
const FEED_COLUMNS: &str = "id, title, owner, parent, standard, url, site_url, entries, final_entry";
const ENTRY_COLUMNS: &str = "id, entry_id, link, title, summary, updated_at, owner";

/// How long a writer waits on another process's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CanopyError::Lock(e.to_string()))
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn folder_from_row(row: &Row<'_>) -> rusqlite::Result<(FolderKey, Folder)> {
        let kind: String = row.get(1)?;
        Ok((
            FolderKey::new(row.get(0)?),
            Folder {
                kind: kind
                    .parse::<FolderKind>()
                    .map_err(|e| conversion_error(1, e))?,
                title: row.get(2)?,
                owner: row.get(3)?,
                parent: row.get::<_, Option<i64>>(4)?.map(FolderKey::new),
                children: json_column(row, 5)?,
            },
        ))
    }

    fn feed_from_row(row: &Row<'_>) -> rusqlite::Result<(FeedKey, Feed)> {
        let standard: String = row.get(4)?;
        Ok((
            FeedKey::new(row.get(0)?),
            Feed {
                title: row.get(1)?,
                owner: row.get(2)?,
                parent: row.get::<_, Option<i64>>(3)?.map(FolderKey::new),
                standard: standard.parse().map_err(|e| conversion_error(4, e))?,
                url: row.get(5)?,
                site_url: row.get(6)?,
                entries: json_column(row, 7)?,
                final_entry: row.get(8)?,
            },
        ))
    }

    fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<(EntryKey, Entry)> {
        Ok((
            EntryKey::new(row.get(0)?),
            Entry {
                id: row.get(1)?,
                link: row.get(2)?,
                title: row.get(3)?,
                summary: row.get(4)?,
                updated: row
                    .get::<_, Option<String>>(5)?
                    .and_then(|s| Self::parse_datetime(&s)),
                owner: row.get(6)?,
            },
        ))
    }

    fn load_children(conn: &Connection, key: FolderKey) -> Result<Vec<ChildKey>> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT children FROM folders WHERE id = ?1",
                params![key.id()],
                |row| row.get(0),
            )
            .optional()?;
        let raw = raw.ok_or(CanopyError::FolderNotFound(key))?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn save_children(conn: &Connection, key: FolderKey, children: &[ChildKey]) -> Result<()> {
        conn.execute(
            "UPDATE folders SET children = ?1 WHERE id = ?2",
            params![to_json(children)?, key.id()],
        )?;
        Ok(())
    }

    fn append_child(conn: &Connection, parent: FolderKey, child: ChildKey) -> Result<()> {
        let mut children = Self::load_children(conn, parent)?;
        children.push(child);
        Self::save_children(conn, parent, &children)
    }

    fn load_entry_keys(conn: &Connection, feed: FeedKey) -> Result<Vec<EntryKey>> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT entries FROM feeds WHERE id = ?1",
                params![feed.id()],
                |row| row.get(0),
            )
            .optional()?;
        let raw = raw.ok_or(CanopyError::FeedNotFound(feed))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn conversion_error<E: std::fmt::Display>(idx: usize, e: E) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.to_string().into())
}

impl Store for SqliteStore {
    fn insert_folder(&self, folder: &Folder) -> Result<FolderKey> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        if folder.is_root() {
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM folders WHERE owner = ?1 AND kind = 'root'",
                    params![folder.owner],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Err(CanopyError::RootExists(folder.owner.clone()));
            }
        }

        tx.execute(
            "INSERT INTO folders (kind, title, owner, parent, children) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                folder.kind.as_str(),
                folder.title,
                folder.owner,
                folder.parent.map(FolderKey::id),
                to_json(&folder.children)?
            ],
        )?;
        let key = FolderKey::new(tx.last_insert_rowid());

        if !folder.is_root() {
            let parent = folder.parent.ok_or(CanopyError::MissingParent)?;
            Self::append_child(&tx, parent, ChildKey::Folder(key))?;
        }

        tx.commit()?;
        Ok(key)
    }

    fn get_folder(&self, key: FolderKey) -> Result<Option<Folder>> {
        let conn = self.conn()?;
        let result = conn
            .query_row(
                &format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?1"),
                params![key.id()],
                Self::folder_from_row,
            )
            .optional()?;
        Ok(result.map(|(_, folder)| folder))
    }

    fn find_root_folder(&self, owner: &str) -> Result<Option<(FolderKey, Folder)>> {
        let conn = self.conn()?;
        let result = conn
            .query_row(
                &format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE owner = ?1 AND kind = 'root'"),
                params![owner],
                Self::folder_from_row,
            )
            .optional()?;
        Ok(result)
    }

    fn root_folders(&self) -> Result<Vec<FolderKey>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id FROM folders WHERE kind = 'root' ORDER BY id")?;
        let keys = stmt
            .query_map([], |row| row.get(0).map(FolderKey::new))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    fn rename_folder(&self, key: FolderKey, title: &str) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE folders SET title = ?1 WHERE id = ?2",
            params![title, key.id()],
        )?;
        if changed == 0 {
            return Err(CanopyError::FolderNotFound(key));
        }
        Ok(())
    }

    fn detach_child(&self, parent: FolderKey, child: ChildKey) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut children = Self::load_children(&tx, parent)?;
        children.retain(|c| *c != child);
        Self::save_children(&tx, parent, &children)?;

        tx.commit()?;
        Ok(())
    }

    fn delete_folder_tree(&self, key: FolderKey) -> Result<usize> {
        let mut conn = self.conn()?;
        // Take the write lock up front so no other connection can link a
        // child into the subtree while it is being walked.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let parent: Option<Option<i64>> = tx
            .query_row(
                "SELECT parent FROM folders WHERE id = ?1",
                params![key.id()],
                |row| row.get(0),
            )
            .optional()?;
        let parent = parent.ok_or(CanopyError::FolderNotFound(key))?;

        if let Some(parent) = parent.map(FolderKey::new) {
            match Self::load_children(&tx, parent) {
                Ok(mut children) => {
                    children.retain(|c| *c != ChildKey::Folder(key));
                    Self::save_children(&tx, parent, &children)?;
                }
                Err(CanopyError::FolderNotFound(_)) => {
                    tracing::warn!(%parent, folder = %key, "parent folder missing on delete");
                }
                Err(e) => return Err(e),
            }
        }

        let mut deleted = 0;
        let mut pending = vec![key];
        while let Some(current) = pending.pop() {
            let children = match Self::load_children(&tx, current) {
                Ok(children) => children,
                Err(CanopyError::FolderNotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            for child in children {
                match child {
                    ChildKey::Folder(sub) => pending.push(sub),
                    ChildKey::Feed(feed) => {
                        tx.execute("DELETE FROM entries WHERE feed_id = ?1", params![feed.id()])?;
                        tx.execute("DELETE FROM feeds WHERE id = ?1", params![feed.id()])?;
                    }
                }
            }
            deleted += tx.execute("DELETE FROM folders WHERE id = ?1", params![current.id()])?;
        }

        tx.commit()?;
        Ok(deleted)
    }

    fn find_feed(&self, owner: &str, url: &str) -> Result<Option<FeedKey>> {
        let conn = self.conn()?;
        let result = conn
            .query_row(
                "SELECT id FROM feeds WHERE owner = ?1 AND url = ?2",
                params![owner, url],
                |row| row.get(0).map(FeedKey::new),
            )
            .optional()?;
        Ok(result)
    }

    fn insert_feed(&self, feed: &Feed) -> Result<FeedInsert> {
        let parent = feed.parent.ok_or(CanopyError::MissingParent)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM feeds WHERE owner = ?1 AND url = ?2",
                params![feed.owner, feed.url],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(FeedInsert::Duplicate(FeedKey::new(id)));
        }

        tx.execute(
            "INSERT INTO feeds (title, owner, parent, standard, url, site_url, entries, final_entry)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                feed.title,
                feed.owner,
                parent.id(),
                feed.standard.as_str(),
                feed.url,
                feed.site_url,
                to_json(&feed.entries)?,
                feed.final_entry
            ],
        )?;
        let key = FeedKey::new(tx.last_insert_rowid());
        Self::append_child(&tx, parent, ChildKey::Feed(key))?;

        tx.commit()?;
        Ok(FeedInsert::Created(key))
    }

    fn get_feed(&self, key: FeedKey) -> Result<Option<Feed>> {
        let conn = self.conn()?;
        let result = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feeds WHERE id = ?1"),
                params![key.id()],
                Self::feed_from_row,
            )
            .optional()?;
        Ok(result.map(|(_, feed)| feed))
    }

    fn rename_feed(&self, key: FeedKey, title: &str) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE feeds SET title = ?1 WHERE id = ?2",
            params![title, key.id()],
        )?;
        if changed == 0 {
            return Err(CanopyError::FeedNotFound(key));
        }
        Ok(())
    }

    fn prepend_entries(
        &self,
        feed: FeedKey,
        keys: &[EntryKey],
        final_entry: Option<&str>,
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let existing = Self::load_entry_keys(&tx, feed)?;
        let mut entries = Vec::with_capacity(keys.len() + existing.len());
        entries.extend_from_slice(keys);
        entries.extend(existing);

        tx.execute(
            "UPDATE feeds SET entries = ?1, final_entry = COALESCE(?2, final_entry) WHERE id = ?3",
            params![to_json(&entries)?, final_entry, feed.id()],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn remove_feed_entries(&self, feed: FeedKey, keys: &[EntryKey]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut entries = Self::load_entry_keys(&tx, feed)?;
        let mut deleted = 0;
        for key in keys {
            deleted += tx.execute(
                "DELETE FROM entries WHERE id = ?1 AND feed_id = ?2",
                params![key.id(), feed.id()],
            )?;
        }
        entries.retain(|key| !keys.contains(key));
        tx.execute(
            "UPDATE feeds SET entries = ?1 WHERE id = ?2",
            params![to_json(&entries)?, feed.id()],
        )?;

        tx.commit()?;
        Ok(deleted)
    }

    fn delete_feed(&self, key: FeedKey) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM entries WHERE feed_id = ?1", params![key.id()])?;
        tx.execute("DELETE FROM feeds WHERE id = ?1", params![key.id()])?;

        tx.commit()?;
        Ok(())
    }

    fn insert_entry(&self, feed: FeedKey, entry: &Entry) -> Result<EntryKey> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO entries (feed_id, entry_id, link, title, summary, updated_at, owner)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                feed.id(),
                entry.id,
                entry.link,
                entry.title,
                entry.summary,
                entry.updated.map(|dt| dt.to_rfc3339()),
                entry.owner
            ],
        )?;
        Ok(EntryKey::new(conn.last_insert_rowid()))
    }

    fn get_entry(&self, key: EntryKey) -> Result<Option<Entry>> {
        let conn = self.conn()?;
        let result = conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
                params![key.id()],
                Self::entry_from_row,
            )
            .optional()?;
        Ok(result.map(|(_, entry)| entry))
    }

    fn find_entry_by_link(&self, feed: FeedKey, link: &str) -> Result<Option<EntryKey>> {
        let conn = self.conn()?;
        let result = conn
            .query_row(
                "SELECT id FROM entries WHERE feed_id = ?1 AND link = ?2 ORDER BY id LIMIT 1",
                params![feed.id(), link],
                |row| row.get(0).map(EntryKey::new),
            )
            .optional()?;
        Ok(result)
    }

    fn delete_entries(&self, keys: &[EntryKey]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut deleted = 0;
        for key in keys {
            deleted += tx.execute("DELETE FROM entries WHERE id = ?1", params![key.id()])?;
        }

        tx.commit()?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Standard;

    fn root(store: &SqliteStore, owner: &str) -> FolderKey {
        store.insert_folder(&Folder::root(owner)).unwrap()
    }

    fn sample_feed(owner: &str, parent: FolderKey, url: &str) -> Feed {
        let mut feed = Feed::decoded(Standard::Rss20, "Sample".into());
        feed.owner = owner.into();
        feed.parent = Some(parent);
        feed.url = url.into();
        feed
    }

    #[test]
    fn test_insert_and_get_folder() {
        let store = SqliteStore::in_memory().unwrap();
        let root_key = root(&store, "alice");

        let child = store
            .insert_folder(&Folder::new("alice", "News", root_key))
            .unwrap();

        let root_folder = store.get_folder(root_key).unwrap().unwrap();
        assert!(root_folder.is_root());
        assert_eq!(root_folder.children, vec![ChildKey::Folder(child)]);

        let child_folder = store.get_folder(child).unwrap().unwrap();
        assert_eq!(child_folder.title, "News");
        assert_eq!(child_folder.parent, Some(root_key));
    }

    #[test]
    fn test_second_root_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        root(&store, "alice");

        let err = store.insert_folder(&Folder::root("alice")).unwrap_err();
        assert!(matches!(err, CanopyError::RootExists(_)));

        // Other owners get their own root.
        root(&store, "bob");
        assert_eq!(store.root_folders().unwrap().len(), 2);
    }

    #[test]
    fn test_folder_under_missing_parent_rolls_back() {
        let store = SqliteStore::in_memory().unwrap();
        let err = store
            .insert_folder(&Folder::new("alice", "Orphan", FolderKey::new(99)))
            .unwrap_err();
        assert!(matches!(err, CanopyError::FolderNotFound(_)));
        assert!(store.get_folder(FolderKey::new(1)).unwrap().is_none());
    }

    #[test]
    fn test_find_root_folder() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.find_root_folder("alice").unwrap().is_none());

        let key = root(&store, "alice");
        let (found, folder) = store.find_root_folder("alice").unwrap().unwrap();
        assert_eq!(found, key);
        assert_eq!(folder.owner, "alice");
    }

    #[test]
    fn test_insert_feed_links_parent() {
        let store = SqliteStore::in_memory().unwrap();
        let root_key = root(&store, "alice");

        let inserted = store
            .insert_feed(&sample_feed("alice", root_key, "https://example.com/feed.xml"))
            .unwrap();
        let FeedInsert::Created(key) = inserted else {
            panic!("expected a new feed, got {:?}", inserted);
        };

        let folder = store.get_folder(root_key).unwrap().unwrap();
        assert_eq!(folder.children, vec![ChildKey::Feed(key)]);

        let feed = store.get_feed(key).unwrap().unwrap();
        assert_eq!(feed.standard, Standard::Rss20);
        assert_eq!(feed.parent, Some(root_key));
    }

    #[test]
    fn test_insert_feed_duplicate_writes_nothing() {
        let store = SqliteStore::in_memory().unwrap();
        let root_key = root(&store, "alice");
        let feed = sample_feed("alice", root_key, "https://example.com/feed.xml");

        let first = store.insert_feed(&feed).unwrap();
        let second = store.insert_feed(&feed).unwrap();

        let FeedInsert::Created(key) = first else {
            panic!("expected a new feed");
        };
        assert_eq!(second, FeedInsert::Duplicate(key));
        assert_eq!(store.get_folder(root_key).unwrap().unwrap().children.len(), 1);
    }

    #[test]
    fn test_same_url_for_different_owners() {
        let store = SqliteStore::in_memory().unwrap();
        let alice = root(&store, "alice");
        let bob = root(&store, "bob");
        let url = "https://example.com/feed.xml";

        store.insert_feed(&sample_feed("alice", alice, url)).unwrap();
        let inserted = store.insert_feed(&sample_feed("bob", bob, url)).unwrap();

        assert!(matches!(inserted, FeedInsert::Created(_)));
        assert!(store.find_feed("bob", url).unwrap().is_some());
    }

    #[test]
    fn test_prepend_entries_keeps_newest_first() {
        let store = SqliteStore::in_memory().unwrap();
        let root_key = root(&store, "alice");
        let FeedInsert::Created(feed) = store
            .insert_feed(&sample_feed("alice", root_key, "https://example.com/feed.xml"))
            .unwrap()
        else {
            panic!("expected a new feed");
        };

        let old = store.insert_entry(feed, &Entry::new("https://example.com/1", "1")).unwrap();
        store.prepend_entries(feed, &[old], Some("https://example.com/1")).unwrap();

        let newer = store.insert_entry(feed, &Entry::new("https://example.com/3", "3")).unwrap();
        let new = store.insert_entry(feed, &Entry::new("https://example.com/2", "2")).unwrap();
        store.prepend_entries(feed, &[newer, new], None).unwrap();

        let stored = store.get_feed(feed).unwrap().unwrap();
        assert_eq!(stored.entries, vec![newer, new, old]);
        // None leaves the watermark alone.
        assert_eq!(stored.final_entry.as_deref(), Some("https://example.com/1"));
    }

    #[test]
    fn test_prepend_entries_missing_feed() {
        let store = SqliteStore::in_memory().unwrap();
        let err = store
            .prepend_entries(FeedKey::new(5), &[EntryKey::new(1)], Some("x"))
            .unwrap_err();
        assert!(matches!(err, CanopyError::FeedNotFound(_)));
    }

    #[test]
    fn test_entry_round_trip_fields() {
        let store = SqliteStore::in_memory().unwrap();
        let mut entry = Entry::new("https://example.com/1", "One").with_id("urn:1");
        entry.summary = Some("Summary".into());
        entry.updated = Some(Utc::now());
        entry.owner = "alice".into();

        let key = store.insert_entry(FeedKey::new(1), &entry).unwrap();
        let stored = store.get_entry(key).unwrap().unwrap();

        assert_eq!(stored.id.as_deref(), Some("urn:1"));
        assert_eq!(stored.summary.as_deref(), Some("Summary"));
        assert_eq!(stored.owner, "alice");
        assert!(stored.updated.is_some());
    }

    #[test]
    fn test_remove_feed_entries_and_find_by_link() {
        let store = SqliteStore::in_memory().unwrap();
        let root_key = root(&store, "alice");
        let FeedInsert::Created(feed) = store
            .insert_feed(&sample_feed("alice", root_key, "https://example.com/feed.xml"))
            .unwrap()
        else {
            panic!("expected a new feed");
        };

        let a = store.insert_entry(feed, &Entry::new("https://example.com/a", "a")).unwrap();
        let b = store.insert_entry(feed, &Entry::new("https://example.com/b", "b")).unwrap();
        store.prepend_entries(feed, &[b, a], None).unwrap();

        assert_eq!(
            store.find_entry_by_link(feed, "https://example.com/a").unwrap(),
            Some(a)
        );
        assert_eq!(store.remove_feed_entries(feed, &[a]).unwrap(), 1);

        assert!(store.get_entry(a).unwrap().is_none());
        assert_eq!(store.get_feed(feed).unwrap().unwrap().entries, vec![b]);
    }

    #[test]
    fn test_delete_feed_removes_entries() {
        let store = SqliteStore::in_memory().unwrap();
        let root_key = root(&store, "alice");
        let FeedInsert::Created(feed) = store
            .insert_feed(&sample_feed("alice", root_key, "https://example.com/feed.xml"))
            .unwrap()
        else {
            panic!("expected a new feed");
        };
        let entry = store.insert_entry(feed, &Entry::new("https://example.com/a", "a")).unwrap();

        store.delete_feed(feed).unwrap();

        assert!(store.get_feed(feed).unwrap().is_none());
        assert!(store.get_entry(entry).unwrap().is_none());
    }

    #[test]
    fn test_detach_child_and_rename() {
        let store = SqliteStore::in_memory().unwrap();
        let root_key = root(&store, "alice");
        let child = store
            .insert_folder(&Folder::new("alice", "Tech", root_key))
            .unwrap();

        store.rename_folder(child, "Technology").unwrap();
        assert_eq!(store.get_folder(child).unwrap().unwrap().title, "Technology");

        store.detach_child(root_key, ChildKey::Folder(child)).unwrap();
        assert!(store.get_folder(root_key).unwrap().unwrap().children.is_empty());

        assert!(matches!(
            store.rename_folder(FolderKey::new(404), "x"),
            Err(CanopyError::FolderNotFound(_))
        ));
    }

    #[test]
    fn test_file_store_waits_on_busy_database() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("canopy.db")).unwrap();

        let timeout: i64 = store
            .conn()
            .unwrap()
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, BUSY_TIMEOUT.as_millis() as i64);
    }

    #[test]
    fn test_delete_folder_tree_cascades() {
        let store = SqliteStore::in_memory().unwrap();
        let root_key = root(&store, "alice");
        let tech = store
            .insert_folder(&Folder::new("alice", "Tech", root_key))
            .unwrap();
        let rust = store
            .insert_folder(&Folder::new("alice", "Rust", tech))
            .unwrap();
        let FeedInsert::Created(feed) = store
            .insert_feed(&sample_feed("alice", rust, "https://example.com/feed.xml"))
            .unwrap()
        else {
            panic!("expected a new feed");
        };
        let entry = store.insert_entry(feed, &Entry::new("https://example.com/a", "a")).unwrap();

        assert_eq!(store.delete_folder_tree(tech).unwrap(), 2);

        assert!(store.get_folder(root_key).unwrap().unwrap().children.is_empty());
        assert!(store.get_folder(rust).unwrap().is_none());
        assert!(store.get_feed(feed).unwrap().is_none());
        assert!(store.get_entry(entry).unwrap().is_none());
        assert!(matches!(
            store.delete_folder_tree(tech),
            Err(CanopyError::FolderNotFound(_))
        ));
    }

    #[test]
    fn test_insert_into_deleted_subtree_leaves_no_feed() {
        let store = SqliteStore::in_memory().unwrap();
        let root_key = root(&store, "alice");
        let tech = store
            .insert_folder(&Folder::new("alice", "Tech", root_key))
            .unwrap();
        let rust = store
            .insert_folder(&Folder::new("alice", "Rust", tech))
            .unwrap();
        let url = "https://example.com/feed.xml";

        store.delete_folder_tree(tech).unwrap();

        // A late registration into the removed subtree rolls back whole.
        assert!(matches!(
            store.insert_feed(&sample_feed("alice", rust, url)),
            Err(CanopyError::FolderNotFound(_))
        ));
        assert!(store.find_feed("alice", url).unwrap().is_none());
        assert!(matches!(
            store.insert_feed(&sample_feed("alice", root_key, url)).unwrap(),
            FeedInsert::Created(_)
        ));
    }
}
