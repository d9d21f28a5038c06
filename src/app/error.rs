use thiserror::Error;

use crate::domain::{EntryKey, FeedKey, FolderKey};

#[derive(Error, Debug)]
pub enum CanopyError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("Store lock poisoned: {0}")]
    Lock(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Unrecognized feed document: {0}")]
    UnrecognizedFormat(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Folder not found: {0}")]
    FolderNotFound(FolderKey),

    #[error("Feed not found: {0}")]
    FeedNotFound(FeedKey),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("The root folder cannot be removed: {0}")]
    RootFolder(FolderKey),

    #[error("Owner {0} already has a root folder")]
    RootExists(String),

    #[error("A non-root folder needs a parent")]
    MissingParent,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl CanopyError {
    pub fn entry_not_found(key: EntryKey) -> Self {
        Self::EntryNotFound(key.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CanopyError>;
