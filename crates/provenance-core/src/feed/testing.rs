//! Test doubles for the feed layer.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;

use super::FeedSource;
use crate::{Error, Result};

/// RSS 2.0 document with one item per title
pub fn rss_feed(titles: &[&str]) -> String {
    let items: String = titles
        .iter()
        .map(|title| {
            let slug = title.to_lowercase().replace(' ', "-");
            format!(
                r#"<item>
      <title>{title}</title>
      <link>https://feed.example.com/items/{slug}</link>
      <guid>https://feed.example.com/items/{slug}</guid>
      <description>About {title}</description>
      <pubDate>Mon, 04 Mar 2024 09:00:00 GMT</pubDate>
    </item>"#
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Feed</title>
    <link>https://feed.example.com/</link>
    <description>Items for tests</description>
    {items}
  </channel>
</rss>"#
    )
}

enum Response {
    Payload(Bytes),
    Failure(String),
}

/// Feed source answering from canned per-URL responses
#[derive(Default)]
pub struct StubSource {
    responses: Mutex<HashMap<String, Response>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(self, url: &str, body: impl Into<String>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Response::Payload(Bytes::from(body.into())));
        self
    }

    pub fn with_failure(self, url: &str, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Response::Failure(message.to_string()));
        self
    }

    /// (url, accept) pairs in call order
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(u, _)| u == url).count()
    }
}

#[async_trait]
impl FeedSource for StubSource {
    async fn fetch(&self, url: &str, accept: &str) -> Result<Bytes> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), accept.to_string()));

        match self.responses.lock().unwrap().get(url) {
            Some(Response::Payload(body)) => Ok(body.clone()),
            Some(Response::Failure(message)) => Err(Error::Transport(message.clone())),
            None => Err(Error::Transport(format!("HTTP 404 Not Found for URL: {}", url))),
        }
    }
}
