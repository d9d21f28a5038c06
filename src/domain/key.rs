//! Opaque entity keys.
//!
//! Keys wrap the store's row id and travel as strings of the form
//! `folder:12`, `feed:7` or `entry:99`. Encoding is lossless: parsing the
//! `Display` output of a key always yields the same key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::app::CanopyError;

macro_rules! entity_key {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(i64);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            pub fn new(id: i64) -> Self {
                Self(id)
            }

            pub fn id(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", Self::PREFIX, self.0)
            }
        }

        impl FromStr for $name {
            type Err = CanopyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let id = s
                    .strip_prefix(Self::PREFIX)
                    .and_then(|rest| rest.strip_prefix(':'))
                    .and_then(|id| id.parse::<i64>().ok())
                    .ok_or_else(|| CanopyError::InvalidKey(s.to_string()))?;
                Ok(Self(id))
            }
        }

        impl TryFrom<String> for $name {
            type Error = CanopyError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(key: $name) -> Self {
                key.to_string()
            }
        }
    };
}

entity_key!(FolderKey, "folder");
entity_key!(FeedKey, "feed");
entity_key!(EntryKey, "entry");

/// A member of a folder's `children` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ChildKey {
    Folder(FolderKey),
    Feed(FeedKey),
}

impl fmt::Display for ChildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildKey::Folder(key) => fmt::Display::fmt(key, f),
            ChildKey::Feed(key) => fmt::Display::fmt(key, f),
        }
    }
}

impl FromStr for ChildKey {
    type Err = CanopyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with(FolderKey::PREFIX) {
            s.parse().map(ChildKey::Folder)
        } else if s.starts_with(FeedKey::PREFIX) {
            s.parse().map(ChildKey::Feed)
        } else {
            Err(CanopyError::InvalidKey(s.to_string()))
        }
    }
}

impl TryFrom<String> for ChildKey {
    type Error = CanopyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ChildKey> for String {
    fn from(key: ChildKey) -> Self {
        key.to_string()
    }
}

impl From<FolderKey> for ChildKey {
    fn from(key: FolderKey) -> Self {
        ChildKey::Folder(key)
    }
}

impl From<FeedKey> for ChildKey {
    fn from(key: FeedKey) -> Self {
        ChildKey::Feed(key)
    }
}

/// Any key the command line may be handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnyKey {
    Folder(FolderKey),
    Feed(FeedKey),
    Entry(EntryKey),
}

impl FromStr for AnyKey {
    type Err = CanopyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with(EntryKey::PREFIX) {
            s.parse().map(AnyKey::Entry)
        } else {
            s.parse::<ChildKey>().map(|child| match child {
                ChildKey::Folder(key) => AnyKey::Folder(key),
                ChildKey::Feed(key) => AnyKey::Feed(key),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display_and_parse() {
        let key = FeedKey::new(42);
        assert_eq!(key.to_string(), "feed:42");
        assert_eq!("feed:42".parse::<FeedKey>().unwrap(), key);
    }

    #[test]
    fn test_key_rejects_wrong_prefix() {
        assert!("folder:1".parse::<FeedKey>().is_err());
        assert!("feed:".parse::<FeedKey>().is_err());
        assert!("feed:abc".parse::<FeedKey>().is_err());
        assert!("feeds:1".parse::<FeedKey>().is_err());
    }

    #[test]
    fn test_child_key_dispatch() {
        assert_eq!(
            "folder:3".parse::<ChildKey>().unwrap(),
            ChildKey::Folder(FolderKey::new(3))
        );
        assert_eq!(
            "feed:9".parse::<ChildKey>().unwrap(),
            ChildKey::Feed(FeedKey::new(9))
        );
        assert!("entry:9".parse::<ChildKey>().is_err());
    }

    #[test]
    fn test_any_key_accepts_entries() {
        assert_eq!(
            "entry:5".parse::<AnyKey>().unwrap(),
            AnyKey::Entry(EntryKey::new(5))
        );
        assert!("bogus".parse::<AnyKey>().is_err());
    }

    #[test]
    fn test_children_serialize_as_strings() {
        let children = vec![
            ChildKey::Folder(FolderKey::new(1)),
            ChildKey::Feed(FeedKey::new(2)),
        ];
        let json = serde_json::to_string(&children).unwrap();
        assert_eq!(json, r#"["folder:1","feed:2"]"#);

        let back: Vec<ChildKey> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, children);
    }
}
