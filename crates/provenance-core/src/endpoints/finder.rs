use async_trait::async_trait;
use chrono::{Duration, Utc};

use super::{EndpointTask, STATUS_FAILED};
use crate::config::SchedulerConfig;
use crate::scheduler::WorkFinder;
use crate::storage::{Database, EndpointRepository};
use crate::{Error, Result};

/// Discovers endpoints whose status equals the requested name.
///
/// A successful task moves its endpoint to "completed". Failed tasks keep
/// their status and stay eligible unless the error is not retryable or the
/// configured failure threshold is reached, in which case the endpoint is
/// parked as "failed".
pub struct EndpointWorkFinder {
    db: Database,
    rearm_after: Option<Duration>,
    max_failures: Option<u32>,
}

impl EndpointWorkFinder {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            rearm_after: None,
            max_failures: None,
        }
    }

    pub fn from_config(db: Database, config: &SchedulerConfig) -> Result<Self> {
        let rearm_after = match config.rearm_after_secs {
            Some(secs) => Some(
                i64::try_from(secs)
                    .ok()
                    .and_then(Duration::try_seconds)
                    .ok_or_else(|| {
                        Error::Config(format!("scheduler.rearm_after_secs is out of range: {}", secs))
                    })?,
            ),
            None => None,
        };

        Ok(Self {
            db,
            rearm_after,
            max_failures: config.max_failures,
        })
    }

    /// Make completed endpoints eligible again once `after` has elapsed
    pub fn with_rearm_after(mut self, after: Duration) -> Self {
        self.rearm_after = Some(after);
        self
    }

    /// Park an endpoint after this many consecutive failures
    pub fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = Some(max_failures);
        self
    }
}

#[async_trait]
impl WorkFinder<EndpointTask> for EndpointWorkFinder {
    async fn find_requested(&self, name: &str) -> Result<Vec<EndpointTask>> {
        let repo = EndpointRepository::new(&self.db);

        // A cutoff before the representable range means nothing is due yet
        if let Some(cutoff) = self.rearm_after.and_then(|after| Utc::now().checked_sub_signed(after)) {
            let rearmed = repo.rearm_completed(cutoff, name).await?;
            if rearmed > 0 {
                tracing::debug!("Re-armed {} completed endpoints as '{}'", rearmed, name);
            }
        }

        let records = repo.find_ready(name).await?;
        tracing::debug!("Found {} endpoints with status '{}'", records.len(), name);

        Ok(records
            .iter()
            .map(|record| EndpointTask::from_record(record, name))
            .collect())
    }

    async fn mark_completed(&self, task: &EndpointTask) -> Result<()> {
        let repo = EndpointRepository::new(&self.db);

        if !repo.mark_completed(task.endpoint()).await? {
            tracing::warn!("Completed endpoint {} is no longer stored", task.endpoint());
        }
        Ok(())
    }

    async fn mark_failed(&self, task: &EndpointTask, error: &Error, retryable: bool) -> Result<()> {
        let repo = EndpointRepository::new(&self.db);
        let message = error.to_string();

        if !retryable {
            repo.mark_failed(task.endpoint(), &message).await?;
            tracing::warn!("Endpoint {} parked as failed: {}", task.endpoint(), message);
            return Ok(());
        }

        let status = repo
            .record_failure(task.endpoint(), &message, self.max_failures)
            .await?;

        if status.as_deref() == Some(STATUS_FAILED) {
            tracing::warn!(
                "Endpoint {} parked as failed after {} consecutive failures",
                task.endpoint(),
                self.max_failures.unwrap_or_default()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::{NewEndpoint, STATUS_COMPLETED};
    use crate::scheduler::Task;

    async fn seeded(urls: &[(&str, &str)]) -> Database {
        let db = Database::new_in_memory().await.unwrap();
        let repo = EndpointRepository::new(&db);
        for (url, status) in urls {
            repo.create(&NewEndpoint::new(*url, "application/xml"), status)
                .await
                .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_finds_only_requested_status() {
        let db = seeded(&[
            ("https://feed.example.com/", "ready"),
            ("https://other.example.com/", "paused"),
        ])
        .await;
        let finder = EndpointWorkFinder::new(db);

        let tasks = finder.find_requested("ready").await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].endpoint(), "https://feed.example.com/");
        assert_eq!(tasks[0].accept(), "application/xml");
        assert_eq!(tasks[0].worker_name(), "ready");

        assert!(finder.find_requested("unknown").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_completed_endpoint_is_not_rediscovered() {
        let db = seeded(&[("https://feed.example.com/", "ready")]).await;
        let finder = EndpointWorkFinder::new(db.clone());

        let tasks = finder.find_requested("ready").await.unwrap();
        finder.mark_completed(&tasks[0]).await.unwrap();

        assert!(finder.find_requested("ready").await.unwrap().is_empty());
        let record = EndpointRepository::new(&db)
            .find_by_url("https://feed.example.com/")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, STATUS_COMPLETED);
    }

    #[tokio::test]
    async fn test_retryable_failure_stays_eligible() {
        let db = seeded(&[("https://feed.example.com/", "ready")]).await;
        let finder = EndpointWorkFinder::new(db);

        let tasks = finder.find_requested("ready").await.unwrap();
        let error = Error::Transport("HTTP 503".into());
        finder.mark_failed(&tasks[0], &error, true).await.unwrap();

        assert_eq!(finder.find_requested("ready").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_retryable_failure_parks_endpoint() {
        let db = seeded(&[("ftp://feed.example.com/", "ready")]).await;
        let finder = EndpointWorkFinder::new(db);

        let tasks = finder.find_requested("ready").await.unwrap();
        let error = Error::InvalidEndpoint("ftp://feed.example.com/".into());
        finder.mark_failed(&tasks[0], &error, false).await.unwrap();

        assert!(finder.find_requested("ready").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_threshold_parks_endpoint() {
        let db = seeded(&[("https://feed.example.com/", "ready")]).await;
        let finder = EndpointWorkFinder::new(db).with_max_failures(2);
        let error = Error::FeedParse("unexpected eof".into());

        let tasks = finder.find_requested("ready").await.unwrap();
        finder.mark_failed(&tasks[0], &error, true).await.unwrap();
        assert_eq!(finder.find_requested("ready").await.unwrap().len(), 1);

        finder.mark_failed(&tasks[0], &error, true).await.unwrap();
        assert!(finder.find_requested("ready").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rearm_makes_completed_endpoint_eligible() {
        let db = seeded(&[("https://feed.example.com/", "ready")]).await;
        let finder = EndpointWorkFinder::new(db).with_rearm_after(Duration::zero());

        let tasks = finder.find_requested("ready").await.unwrap();
        finder.mark_completed(&tasks[0]).await.unwrap();

        assert_eq!(finder.find_requested("ready").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_from_config() {
        let db = seeded(&[]).await;
        let config = SchedulerConfig {
            max_failures: Some(3),
            rearm_after_secs: Some(600),
            ..SchedulerConfig::default()
        };

        let finder = EndpointWorkFinder::from_config(db, &config).unwrap();
        assert_eq!(finder.max_failures, Some(3));
        assert_eq!(finder.rearm_after, Some(Duration::seconds(600)));
    }

    #[tokio::test]
    async fn test_from_config_rejects_out_of_range_rearm() {
        let db = seeded(&[]).await;
        let config = SchedulerConfig {
            rearm_after_secs: Some(100_000_000_000_000_000),
            ..SchedulerConfig::default()
        };

        match EndpointWorkFinder::from_config(db, &config) {
            Err(Error::Config(msg)) => assert!(msg.contains("rearm_after_secs")),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("out-of-range rearm_after_secs was accepted"),
        }
    }

    #[tokio::test]
    async fn test_huge_rearm_window_never_rearms() {
        let db = seeded(&[("https://feed.example.com/", "ready")]).await;
        let finder = EndpointWorkFinder::new(db).with_rearm_after(Duration::MAX);

        let tasks = finder.find_requested("ready").await.unwrap();
        finder.mark_completed(&tasks[0]).await.unwrap();

        assert!(finder.find_requested("ready").await.unwrap().is_empty());
    }
}
