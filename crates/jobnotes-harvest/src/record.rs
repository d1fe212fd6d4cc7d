use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Site assigned identifier of a posting, stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostingId(String);

impl PostingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostingId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PostingId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for PostingId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// One fetched and normalized job posting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingRecord {
    pub id: PostingId,
    pub title: String,
    pub company: String,
    pub salary: String,
    pub location: String,
    pub description: String,
    pub education: String,
    pub experience: String,
    /// Free text skill requirements
    pub requirement: String,
    /// "Specialty tools" as listed by the site, one item per tool
    pub specialties: Vec<String>,
    pub other_requirement: String,
    pub tags: Vec<String>,
    pub appeared_at: String,
    pub url: String,
}

impl PostingRecord {
    pub fn new(id: impl Into<PostingId>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}
