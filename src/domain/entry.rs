use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Identifier carried by the source document, if the format has one.
    pub id: Option<String>,
    pub link: String,
    pub title: String,
    pub summary: Option<String>,
    pub updated: Option<DateTime<Utc>>,
    pub owner: String,
}

impl Entry {
    pub fn new(link: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: None,
            link: link.into(),
            title: title.into(),
            summary: None,
            updated: None,
            owner: String::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// The value compared against a feed's watermark.
    ///
    /// Falls back to the link when the source gave no id, so two distinct
    /// items sharing a URL are indistinguishable.
    pub fn identity(&self) -> &str {
        match self.id.as_deref() {
            Some(id) if !id.trim().is_empty() => id,
            _ => &self.link,
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled)"
        } else {
            &self.title
        }
    }
}
