use chrono::{DateTime, Utc};
use feed_rs::parser;

use super::models::NewArticle;
use crate::{Error, Result};

/// Parsed feed data from RSS/Atom content
pub struct ParsedFeed {
    pub title: Option<String>,
    pub articles: Vec<NewArticle>,
}

/// Parse RSS/Atom feed content fetched from `endpoint_url`.
///
/// Every entry becomes an available article keyed by the entry id, so the
/// same payload always maps to the same (endpoint, guid) pairs.
pub fn parse_feed(content: &[u8], endpoint_url: &str) -> Result<ParsedFeed> {
    let feed = parser::parse(content).map_err(|e| Error::FeedParse(e.to_string()))?;

    let title = feed.title.map(|t| t.content);

    let articles = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry.links.first().map(|l| l.href.clone());

            let title = entry
                .title
                .map(|t| html_to_text(&t.content).trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled".to_string());

            let summary = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .map(|html| html_to_text(&html).trim().to_string())
                .filter(|s| !s.is_empty());

            let published_at = entry.published.or(entry.updated).map(DateTime::<Utc>::from);

            NewArticle {
                endpoint_url: Some(endpoint_url.to_string()),
                guid: Some(entry.id),
                title,
                link,
                summary,
                published_at,
                available: true,
            }
        })
        .collect();

    Ok(ParsedFeed { title, articles })
}

/// Convert HTML content to plain text
fn html_to_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), 80).unwrap_or_else(|_| html.to_string())
}
