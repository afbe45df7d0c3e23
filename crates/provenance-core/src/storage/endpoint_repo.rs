use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::Database;
use crate::endpoints::{EndpointRecord, NewEndpoint, STATUS_COMPLETED, STATUS_FAILED};
use crate::Result;

/// Repository for endpoint records and their status transitions
pub struct EndpointRepository<'a> {
    db: &'a Database,
}

#[derive(FromRow)]
struct EndpointRow {
    id: String,
    url: String,
    accept: String,
    status: String,
    failure_count: i64,
    last_error: Option<String>,
    last_completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EndpointRow> for EndpointRecord {
    fn from(row: EndpointRow) -> Self {
        EndpointRecord {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            url: row.url,
            accept: row.accept,
            status: row.status,
            failure_count: row.failure_count as u32,
            last_error: row.last_error,
            last_completed_at: row.last_completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_ENDPOINT: &str = r#"
    SELECT id, url, accept, status, failure_count, last_error,
           last_completed_at, created_at, updated_at
    FROM endpoints
"#;

impl<'a> EndpointRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Register an endpoint with an initial status.
    /// Returns `None` when the URL is already registered.
    pub async fn create(&self, new_endpoint: &NewEndpoint, status: &str) -> Result<Option<EndpointRecord>> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO endpoints (id, url, accept, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&new_endpoint.url)
        .bind(&new_endpoint.accept)
        .bind(status)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_by_url(&new_endpoint.url).await
    }

    /// Find an endpoint by URL
    pub async fn find_by_url(&self, url: &str) -> Result<Option<EndpointRecord>> {
        let row: Option<EndpointRow> = sqlx::query_as(&format!("{} WHERE url = ?", SELECT_ENDPOINT))
            .bind(url)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(EndpointRecord::from))
    }

    /// All endpoints in insertion order
    pub async fn list_all(&self) -> Result<Vec<EndpointRecord>> {
        let rows: Vec<EndpointRow> = sqlx::query_as(&format!("{} ORDER BY rowid ASC", SELECT_ENDPOINT))
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows.into_iter().map(EndpointRecord::from).collect())
    }

    /// Endpoints whose status equals `status`, in insertion order
    pub async fn find_ready(&self, status: &str) -> Result<Vec<EndpointRecord>> {
        let rows: Vec<EndpointRow> = sqlx::query_as(&format!(
            "{} WHERE status = ? ORDER BY rowid ASC",
            SELECT_ENDPOINT
        ))
        .bind(status)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(EndpointRecord::from).collect())
    }

    /// Transition an endpoint to "completed" and clear its failure state.
    /// Returns false when no endpoint has this URL.
    pub async fn mark_completed(&self, url: &str) -> Result<bool> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE endpoints
            SET status = ?,
                failure_count = 0,
                last_error = NULL,
                last_completed_at = ?,
                updated_at = ?
            WHERE url = ?
            "#,
        )
        .bind(STATUS_COMPLETED)
        .bind(now)
        .bind(now)
        .bind(url)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count a failed attempt. The status is left as is unless
    /// `max_failures` consecutive failures have been reached, in which case
    /// the endpoint moves to "failed". Returns the resulting status.
    pub async fn record_failure(
        &self,
        url: &str,
        error: &str,
        max_failures: Option<u32>,
    ) -> Result<Option<String>> {
        let now = Utc::now();
        let max_failures = max_failures.map(i64::from);

        let row: Option<(String,)> = sqlx::query_as(
            r#"
            UPDATE endpoints
            SET failure_count = failure_count + 1,
                last_error = ?,
                status = CASE
                    WHEN ? IS NOT NULL AND failure_count + 1 >= ? THEN ?
                    ELSE status
                END,
                updated_at = ?
            WHERE url = ?
            RETURNING status
            "#,
        )
        .bind(error)
        .bind(max_failures)
        .bind(max_failures)
        .bind(STATUS_FAILED)
        .bind(now)
        .bind(url)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|(status,)| status))
    }

    /// Park an endpoint as "failed" so it is no longer discovered
    pub async fn mark_failed(&self, url: &str, error: &str) -> Result<bool> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE endpoints
            SET status = ?,
                failure_count = failure_count + 1,
                last_error = ?,
                updated_at = ?
            WHERE url = ?
            "#,
        )
        .bind(STATUS_FAILED)
        .bind(error)
        .bind(now)
        .bind(url)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Move completed endpoints whose last completion is at or before
    /// `completed_before` back to `status`. Returns how many were re-armed.
    pub async fn rearm_completed(&self, completed_before: DateTime<Utc>, status: &str) -> Result<u32> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE endpoints
            SET status = ?,
                updated_at = ?
            WHERE status = ?
              AND last_completed_at IS NOT NULL
              AND last_completed_at <= ?
            "#,
        )
        .bind(status)
        .bind(now)
        .bind(STATUS_COMPLETED)
        .bind(completed_before)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() as u32)
    }

    /// Set every endpoint to `status` and clear failure state
    pub async fn reset_all(&self, status: &str) -> Result<u32> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE endpoints
            SET status = ?,
                failure_count = 0,
                last_error = NULL,
                updated_at = ?
            "#,
        )
        .bind(status)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() as u32)
    }

    /// Get total endpoint count
    pub async fn count(&self) -> Result<u32> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM endpoints")
            .fetch_one(self.db.pool())
            .await?;

        Ok(count.0 as u32)
    }
}
