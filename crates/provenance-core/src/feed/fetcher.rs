use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderValue, ACCEPT, ACCEPT_ENCODING};
use reqwest::{Client, Proxy, StatusCode};
use std::time::Duration;
use url::Url;

use crate::config::FetchConfig;
use crate::{Error, Result};

const MAX_FEED_BYTES: usize = 5 * 1024 * 1024;
const INITIAL_RETRY_DELAY_MS: u64 = 500;
const USER_AGENT: &str = concat!("provenance/", env!("CARGO_PKG_VERSION"));

/// Retrieves the raw payload of a feed endpoint
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch `url`, asking for `accept` as the media type
    async fn fetch(&self, url: &str, accept: &str) -> Result<Bytes>;
}

/// HTTP feed source with retries
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
}

impl HttpFetcher {
    /// Create a new fetcher with configuration
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Self::build_client(config.request_timeout_secs, &config.proxy_url)?;

        Ok(Self {
            client,
            max_retries: config.max_retries.max(1),
        })
    }

    /// Build HTTP client with optional proxy
    fn build_client(timeout_secs: u64, proxy_url: &Option<String>) -> Result<Client> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10));

        match proxy_url {
            Some(proxy) => {
                let proxy = Proxy::all(proxy)
                    .map_err(|e| Error::Config(format!("Invalid proxy URL: {}", e)))?;
                builder = builder.proxy(proxy);
                tracing::info!("Using HTTP proxy for feed fetching");
            }
            None => {
                builder = builder.no_proxy();
            }
        }

        builder.build().map_err(Error::Http)
    }

    /// Fetch with retry and exponential backoff
    async fn fetch_with_retry(&self, url: &str, accept: &HeaderValue) -> Result<(StatusCode, Bytes)> {
        let mut last_error = None;
        let mut delay_ms = INITIAL_RETRY_DELAY_MS;

        for attempt in 0..self.max_retries {
            tracing::debug!("Fetch attempt {} for {}", attempt + 1, url);

            match self
                .client
                .get(url)
                .header(ACCEPT, accept.clone())
                .header(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate, br"))
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
                        tracing::warn!("Received {} for {}, attempt {}", status, url, attempt + 1);
                        last_error = Some(Error::Transport(format!("HTTP {} for URL: {}", status, url)));
                    } else {
                        if let Some(length) = response.content_length() {
                            ensure_content_size(length as usize, url)?;
                        }

                        match response.bytes().await {
                            Ok(bytes) => return Ok((status, bytes)),
                            Err(e) => {
                                tracing::warn!("Failed to read response body: {}", e);
                                last_error = Some(Error::Http(e));
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Request failed for {} (attempt {}): {}", url, attempt + 1, e);
                    last_error = Some(Error::Http(e));
                }
            }

            if attempt + 1 < self.max_retries {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms *= 2;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::Transport(format!(
                "Failed to fetch URL after {} attempts: {}",
                self.max_retries, url
            ))
        }))
    }
}

#[async_trait]
impl FeedSource for HttpFetcher {
    async fn fetch(&self, url: &str, accept: &str) -> Result<Bytes> {
        Url::parse(url)?;
        let accept = HeaderValue::from_str(accept)
            .map_err(|_| Error::InvalidEndpoint(format!("invalid accept header '{}'", accept)))?;

        tracing::info!("Fetching feed from: {}", url);

        let (status, content) = self.fetch_with_retry(url, &accept).await?;

        ensure_content_size(content.len(), url)?;

        if !status.is_success() {
            return Err(Error::Transport(format!("HTTP {} for URL: {}", status, url)));
        }

        Ok(content)
    }
}

fn ensure_content_size(size: usize, url: &str) -> Result<()> {
    if size > MAX_FEED_BYTES {
        return Err(Error::Transport(format!(
            "Feed too large ({} bytes) for URL: {}",
            size, url
        )));
    }
    Ok(())
}
