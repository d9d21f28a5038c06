pub mod entry;
pub mod feed;
pub mod folder;
pub mod key;

pub use entry::Entry;
pub use feed::{Feed, Standard};
pub use folder::{Folder, FolderKind, Node};
pub use key::{AnyKey, ChildKey, EntryKey, FeedKey, FolderKey};
