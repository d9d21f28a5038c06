use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::app::CanopyError;
use crate::domain::{ChildKey, Feed, FeedKey, FolderKey};

pub const ROOT_TITLE: &str = "root";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FolderKind {
    Root,
    Other,
}

impl FolderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FolderKind::Root => "root",
            FolderKind::Other => "other",
        }
    }
}

impl fmt::Display for FolderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FolderKind {
    type Err = CanopyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(FolderKind::Root),
            "other" => Ok(FolderKind::Other),
            other => Err(CanopyError::Other(format!("Unknown folder kind: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub kind: FolderKind,
    pub title: String,
    pub owner: String,
    pub parent: Option<FolderKey>,
    pub children: Vec<ChildKey>,
}

impl Folder {
    pub fn root(owner: &str) -> Self {
        Self {
            kind: FolderKind::Root,
            title: ROOT_TITLE.to_string(),
            owner: owner.to_string(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn new(owner: &str, title: &str, parent: FolderKey) -> Self {
        Self {
            kind: FolderKind::Other,
            title: title.to_string(),
            owner: owner.to_string(),
            parent: Some(parent),
            children: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.kind == FolderKind::Root
    }
}

/// A loaded child of a folder.
#[derive(Debug, Clone)]
pub enum Node {
    Folder(FolderKey, Folder),
    Feed(FeedKey, Feed),
}

impl Node {
    pub fn key(&self) -> ChildKey {
        match self {
            Node::Folder(key, _) => ChildKey::Folder(*key),
            Node::Feed(key, _) => ChildKey::Feed(*key),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Node::Folder(_, folder) => &folder.title,
            Node::Feed(_, feed) => feed.display_title(),
        }
    }
}
