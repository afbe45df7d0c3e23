use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;

use crate::Result;

/// Process-local SQLite store shared by the finder, the workers and readers.
///
/// The database lives in memory on a single pinned connection, so it exists
/// exactly as long as the process and every write is serialized through that
/// connection.
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create the in-memory database and run migrations
    pub async fn new_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // An in-memory database is dropped with its connection: keep exactly
        // one open and never recycle it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        tracing::debug!("Running database migrations...");

        sqlx::query(MIGRATION_001_ENDPOINTS)
            .execute(&self.pool)
            .await?;

        sqlx::query(MIGRATION_002_ARTICLES)
            .execute(&self.pool)
            .await?;

        sqlx::query(MIGRATION_INDEXES)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Database migrations completed");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

const MIGRATION_001_ENDPOINTS: &str = r#"
CREATE TABLE IF NOT EXISTS endpoints (
    id TEXT PRIMARY KEY,
    url TEXT NOT NULL UNIQUE,
    accept TEXT NOT NULL,
    status TEXT NOT NULL,
    failure_count INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    last_completed_at DATETIME,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL
)
"#;

const MIGRATION_002_ARTICLES: &str = r#"
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    endpoint_url TEXT,
    guid TEXT,
    title TEXT NOT NULL,
    link TEXT,
    summary TEXT,
    published_at DATETIME,
    available INTEGER NOT NULL DEFAULT 1,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL,
    UNIQUE(endpoint_url, guid)
)
"#;

const MIGRATION_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_endpoints_status ON endpoints(status);
CREATE INDEX IF NOT EXISTS idx_articles_available ON articles(available)
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_data_survives_across_queries() {
        let db = Database::new_in_memory().await.unwrap();

        sqlx::query(
            "INSERT INTO articles (title, created_at, updated_at) VALUES ('kept', '2024-01-01', '2024-01-01')",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let clone = db.clone();
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(clone.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn test_databases_are_isolated() {
        let first = Database::new_in_memory().await.unwrap();
        let second = Database::new_in_memory().await.unwrap();

        sqlx::query(
            "INSERT INTO articles (title, created_at, updated_at) VALUES ('only here', '2024-01-01', '2024-01-01')",
        )
        .execute(first.pool())
        .await
        .unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(second.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }
}
