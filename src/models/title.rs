//! Title (catalog entry) model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Bibliographic record, deduplicated by ISBN.
///
/// The ISBN is the external catalog identity and never changes; descriptive
/// fields may be corrected administratively.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Title {
    pub isbn: String,
    pub title: String,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Bibliographic metadata returned by the external catalog lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleMetadata {
    pub title: String,
    pub author: Option<String>,
    pub publisher: Option<String>,
    #[serde(rename = "image")]
    pub image_url: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "pubdate")]
    pub published_at: Option<NaiveDate>,
}

impl TitleMetadata {
    /// Materialize a catalog record for a newly referenced ISBN
    pub fn into_title(self, isbn: &str, now: DateTime<Utc>) -> Title {
        Title {
            isbn: isbn.to_string(),
            title: self.title,
            author: self.author,
            publisher: self.publisher,
            image_url: self.image_url,
            description: self.description,
            published_at: self.published_at,
            created_at: now,
        }
    }
}

/// Administrative corrections to a title's descriptive fields.
/// Fields left as `None` are kept unchanged; the ISBN cannot be corrected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleCorrections {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<NaiveDate>,
}

impl TitleCorrections {
    pub fn apply(&self, mut title: Title) -> Title {
        if let Some(ref t) = self.title {
            title.title = t.clone();
        }
        if let Some(ref a) = self.author {
            title.author = Some(a.clone());
        }
        if let Some(ref p) = self.publisher {
            title.publisher = Some(p.clone());
        }
        if let Some(ref i) = self.image_url {
            title.image_url = Some(i.clone());
        }
        if let Some(ref d) = self.description {
            title.description = Some(d.clone());
        }
        if let Some(p) = self.published_at {
            title.published_at = Some(p);
        }
        title
    }
}
