use chrono::{DateTime, Utc};
use sqlx::{FromRow, Sqlite};

use super::Database;
use crate::feed::{Article, NewArticle};
use crate::Result;

/// Repository for article CRUD operations
pub struct ArticleRepository<'a> {
    db: &'a Database,
}

#[derive(FromRow)]
struct ArticleRow {
    id: i64,
    endpoint_url: Option<String>,
    guid: Option<String>,
    title: String,
    link: Option<String>,
    summary: Option<String>,
    published_at: Option<DateTime<Utc>>,
    available: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            id: row.id,
            endpoint_url: row.endpoint_url,
            guid: row.guid,
            title: row.title,
            link: row.link,
            summary: row.summary,
            published_at: row.published_at,
            available: row.available != 0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_ARTICLE: &str = r#"
    SELECT id, endpoint_url, guid, title, link, summary, published_at,
           available, created_at, updated_at
    FROM articles
"#;

/// Insert one article, ignoring it when (endpoint_url, guid) already exists.
/// Returns whether a row was written.
async fn insert_article<'e, E>(executor: E, article: &NewArticle, now: DateTime<Utc>) -> Result<bool>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO articles
        (endpoint_url, guid, title, link, summary, published_at, available, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&article.endpoint_url)
    .bind(&article.guid)
    .bind(&article.title)
    .bind(&article.link)
    .bind(&article.summary)
    .bind(article.published_at)
    .bind(article.available as i32)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

impl<'a> ArticleRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Store a single article
    pub async fn save(&self, article: &NewArticle) -> Result<bool> {
        insert_article(self.db.pool(), article, Utc::now()).await
    }

    /// Insert an article or refresh the stored copy with the same
    /// (endpoint_url, guid). Returns true when a new row was created.
    pub async fn upsert(&self, article: &NewArticle) -> Result<bool> {
        let now = Utc::now();

        if insert_article(self.db.pool(), article, now).await? {
            return Ok(true);
        }

        sqlx::query(
            r#"
            UPDATE articles
            SET title = ?,
                link = COALESCE(?, link),
                summary = COALESCE(?, summary),
                published_at = COALESCE(?, published_at),
                available = ?,
                updated_at = ?
            WHERE endpoint_url = ? AND guid = ?
            "#,
        )
        .bind(&article.title)
        .bind(&article.link)
        .bind(&article.summary)
        .bind(article.published_at)
        .bind(article.available as i32)
        .bind(now)
        .bind(&article.endpoint_url)
        .bind(&article.guid)
        .execute(self.db.pool())
        .await?;

        Ok(false)
    }

    /// Upsert multiple articles, returning count of newly created
    pub async fn save_many(&self, articles: &[NewArticle]) -> Result<u32> {
        let mut created = 0;

        for article in articles {
            if self.upsert(article).await? {
                created += 1;
            }
        }

        Ok(created)
    }

    /// Atomically replace the whole article set
    pub async fn replace_all(&self, articles: &[NewArticle]) -> Result<u32> {
        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;

        sqlx::query("DELETE FROM articles").execute(&mut *tx).await?;

        let mut written = 0;
        for article in articles {
            if insert_article(&mut *tx, article, now).await? {
                written += 1;
            }
        }

        tx.commit().await?;
        Ok(written)
    }

    /// Delete every article
    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM articles")
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected())
    }

    /// All articles in insertion order
    pub async fn find_all(&self) -> Result<Vec<Article>> {
        let rows: Vec<ArticleRow> = sqlx::query_as(&format!("{} ORDER BY id ASC", SELECT_ARTICLE))
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows.into_iter().map(Article::from).collect())
    }

    /// Articles flagged available, in insertion order
    pub async fn find_available(&self) -> Result<Vec<Article>> {
        let rows: Vec<ArticleRow> = sqlx::query_as(&format!(
            "{} WHERE available = 1 ORDER BY id ASC",
            SELECT_ARTICLE
        ))
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(Article::from).collect())
    }

    /// Find an article by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Article>> {
        let row: Option<ArticleRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_ARTICLE))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(Article::from))
    }

    /// Get total article count
    pub async fn count(&self) -> Result<u32> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(self.db.pool())
            .await?;

        Ok(count.0 as u32)
    }
}
