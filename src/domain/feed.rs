use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::app::CanopyError;
use crate::domain::{EntryKey, FolderKey};

/// The three syndication formats a feed can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Standard {
    Atom,
    Rss10,
    Rss20,
}

impl Standard {
    pub fn as_str(self) -> &'static str {
        match self {
            Standard::Atom => "Atom",
            Standard::Rss10 => "RSS1.0",
            Standard::Rss20 => "RSS2.0",
        }
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Standard {
    type Err = CanopyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Atom" => Ok(Standard::Atom),
            "RSS1.0" => Ok(Standard::Rss10),
            "RSS2.0" => Ok(Standard::Rss20),
            other => Err(CanopyError::UnrecognizedFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub title: String,
    pub owner: String,
    pub parent: Option<FolderKey>,
    pub standard: Standard,
    pub url: String,
    pub site_url: Option<String>,
    /// Newest first.
    pub entries: Vec<EntryKey>,
    /// Identity of the newest entry already synchronized.
    pub final_entry: Option<String>,
}

impl Feed {
    /// A feed as decoded from a document, not yet owned or placed in a folder.
    pub fn decoded(standard: Standard, title: String) -> Self {
        Self {
            title,
            owner: String::new(),
            parent: None,
            standard,
            url: String::new(),
            site_url: None,
            entries: Vec::new(),
            final_entry: None,
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_labels_round_trip() {
        for standard in [Standard::Atom, Standard::Rss10, Standard::Rss20] {
            assert_eq!(standard.as_str().parse::<Standard>().unwrap(), standard);
        }
        assert!("etc".parse::<Standard>().is_err());
    }

    #[test]
    fn test_display_title_falls_back_to_url() {
        let mut feed = Feed::decoded(Standard::Atom, String::new());
        feed.url = "https://example.com/feed.xml".into();
        assert_eq!(feed.display_title(), "https://example.com/feed.xml");

        feed.title = "Example".into();
        assert_eq!(feed.display_title(), "Example");
    }
}
