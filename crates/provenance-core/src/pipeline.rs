//! Wiring of the store, the endpoint finder and workers into a scheduler.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::endpoints::{EndpointTask, EndpointWorkFinder, EndpointWorker, NewEndpoint};
use crate::feed::{FeedSource, NewArticle};
use crate::scheduler::{SchedulerOptions, WorkScheduler, Worker};
use crate::storage::{ArticleRepository, Database, EndpointRepository};
use crate::Result;

/// What [`seed_store`] wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub endpoints: u32,
    pub articles: u32,
}

/// Register the configured endpoints plus `extra` as ready under the
/// scheduler category, and insert the seed articles into an empty store.
///
/// Endpoints already present are left alone, so seeding twice is harmless.
pub async fn seed_store(db: &Database, config: &AppConfig, extra: &[NewEndpoint]) -> Result<SeedSummary> {
    let endpoint_repo = EndpointRepository::new(db);
    let category = &config.scheduler.category;
    let mut summary = SeedSummary::default();

    let configured = config
        .endpoints
        .iter()
        .map(|e| NewEndpoint::new(e.url.clone(), e.accept.clone()));

    for endpoint in configured.chain(extra.iter().cloned()) {
        if endpoint_repo.create(&endpoint, category).await?.is_some() {
            summary.endpoints += 1;
        } else {
            tracing::debug!("Endpoint already registered: {}", endpoint.url);
        }
    }

    let article_repo = ArticleRepository::new(db);
    if article_repo.count().await? == 0 {
        for seed in &config.articles.seed {
            if article_repo.save(&NewArticle::titled(seed.title.clone(), seed.available)).await? {
                summary.articles += 1;
            }
        }
    }

    tracing::info!(
        "Seeded {} endpoints and {} articles (category '{}')",
        summary.endpoints,
        summary.articles,
        category
    );
    Ok(summary)
}

/// Build a stopped scheduler whose single worker is registered under the
/// configured category.
pub fn build_scheduler(
    db: &Database,
    config: &AppConfig,
    source: Arc<dyn FeedSource>,
) -> Result<WorkScheduler<EndpointTask>> {
    let finder = Arc::new(EndpointWorkFinder::from_config(db.clone(), &config.scheduler)?);
    let worker: Arc<dyn Worker<EndpointTask>> = Arc::new(EndpointWorker::new(
        config.scheduler.category.clone(),
        source,
        db.clone(),
        config.articles.policy,
    ));

    WorkScheduler::new(finder, vec![worker], SchedulerOptions::from_config(&config.scheduler))
}
