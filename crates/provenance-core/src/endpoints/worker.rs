use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::EndpointTask;
use crate::config::ArticlePolicy;
use crate::feed::{parse_feed, FeedSource};
use crate::scheduler::Worker;
use crate::storage::{ArticleRepository, Database};
use crate::{Error, Result};

/// Fetches an endpoint's feed and stores its items as articles
pub struct EndpointWorker {
    name: String,
    source: Arc<dyn FeedSource>,
    db: Database,
    policy: ArticlePolicy,
}

impl EndpointWorker {
    pub fn new(name: impl Into<String>, source: Arc<dyn FeedSource>, db: Database, policy: ArticlePolicy) -> Self {
        Self {
            name: name.into(),
            source,
            db,
            policy,
        }
    }
}

/// Reject anything that is not an absolute http(s) URL
fn validate_endpoint(endpoint: &str) -> Result<()> {
    let url = Url::parse(endpoint)
        .map_err(|e| Error::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(()),
        scheme => Err(Error::InvalidEndpoint(format!(
            "{}: unsupported scheme '{}'",
            endpoint, scheme
        ))),
    }
}

#[async_trait]
impl Worker<EndpointTask> for EndpointWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, task: &EndpointTask) -> Result<()> {
        validate_endpoint(task.endpoint())?;

        let payload = self.source.fetch(task.endpoint(), task.accept()).await?;
        let parsed = parse_feed(&payload, task.endpoint())?;

        let repo = ArticleRepository::new(&self.db);
        let stored = match self.policy {
            ArticlePolicy::Merge => repo.save_many(&parsed.articles).await?,
            ArticlePolicy::Replace => repo.replace_all(&parsed.articles).await?,
        };

        tracing::info!(
            "Fetched {} items from {} ({} new, policy {:?})",
            parsed.articles.len(),
            task.endpoint(),
            stored,
            self.policy
        );
        Ok(())
    }
}
