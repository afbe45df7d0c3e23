use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    /// Endpoint the article was fetched from; `None` for seeded articles
    pub endpoint_url: Option<String>,
    /// Feed-provided identifier, unique per endpoint
    pub guid: Option<String>,
    pub title: String,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data required to create a new article
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub endpoint_url: Option<String>,
    pub guid: Option<String>,
    pub title: String,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub available: bool,
}

impl NewArticle {
    /// An article with only a title, as created from seed data
    pub fn titled(title: impl Into<String>, available: bool) -> Self {
        Self {
            endpoint_url: None,
            guid: None,
            title: title.into(),
            link: None,
            summary: None,
            published_at: None,
            available,
        }
    }
}

/// Listing view of an article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleInfo {
    pub id: i64,
    pub title: String,
    pub available: bool,
}

impl From<&Article> for ArticleInfo {
    fn from(article: &Article) -> Self {
        Self {
            id: article.id,
            title: article.title.clone(),
            available: article.available,
        }
    }
}
