use async_trait::async_trait;

use super::schema::Database;
use super::types::StorageError;
use crate::sources::{CatalogFeed, FeedCatalog, SourceError};

/// Maximum number of catalog rows returned by a single lookup
const MAX_CATALOG_ROWS: i64 = 500;

const CATALOG_COLUMNS: &str =
    "feed_url, site_url, title, description, favicon_url, category, subscriber_count";

/// Escapes `%`, `_` and `\` so user input matches literally inside `LIKE ... ESCAPE '\'`.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl Database {
    // ========================================================================
    // Catalog Operations
    // ========================================================================

    /// Inserts a catalog feed, or updates the existing row with the same `feed_url`.
    pub async fn add_popular_feed(&self, feed: &CatalogFeed) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO popular_feeds
                (feed_url, site_url, title, description, favicon_url, category, subscriber_count)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(feed_url) DO UPDATE SET
                site_url = excluded.site_url,
                title = excluded.title,
                description = excluded.description,
                favicon_url = excluded.favicon_url,
                category = excluded.category,
                subscriber_count = excluded.subscriber_count
        "#,
        )
        .bind(&feed.feed_url)
        .bind(&feed.site_url)
        .bind(&feed.title)
        .bind(&feed.description)
        .bind(&feed.favicon_url)
        .bind(&feed.category)
        .bind(feed.subscriber_count)
        .execute(&self.pool)
        .await?;

        tracing::info!(feed_url = %feed.feed_url, "Catalog feed saved");
        Ok(())
    }

    /// Catalog feeds whose title, description or category contains `query`
    /// (case-insensitive), most subscribed first.
    pub async fn search_popular_feeds(&self, query: &str) -> Result<Vec<CatalogFeed>, StorageError> {
        let feeds = sqlx::query_as::<_, CatalogFeed>(&format!(
            r#"
            SELECT {CATALOG_COLUMNS}
            FROM popular_feeds
            WHERE title LIKE ?1 ESCAPE '\'
               OR description LIKE ?1 ESCAPE '\'
               OR category LIKE ?1 ESCAPE '\'
            ORDER BY COALESCE(subscriber_count, 0) DESC, title
            LIMIT ?2
        "#
        ))
        .bind(like_pattern(query))
        .bind(MAX_CATALOG_ROWS)
        .fetch_all(&self.pool)
        .await?;

        Ok(feeds)
    }

    /// Catalog feeds in `category` (case-insensitive), or all of them when `None`.
    pub async fn popular_feeds_by_category(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<CatalogFeed>, StorageError> {
        let category = category.map(str::trim).filter(|c| !c.is_empty());

        let feeds = sqlx::query_as::<_, CatalogFeed>(&format!(
            r#"
            SELECT {CATALOG_COLUMNS}
            FROM popular_feeds
            WHERE ?1 IS NULL OR category = ?1 COLLATE NOCASE
            ORDER BY COALESCE(subscriber_count, 0) DESC, title
            LIMIT ?2
        "#
        ))
        .bind(category)
        .bind(MAX_CATALOG_ROWS)
        .fetch_all(&self.pool)
        .await?;

        Ok(feeds)
    }

    /// Distinct non-empty catalog categories, sorted.
    pub async fn popular_categories(&self) -> Result<Vec<String>, StorageError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT category FROM popular_feeds
            WHERE category IS NOT NULL AND TRIM(category) != ''
            ORDER BY category
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(c,)| c).collect())
    }
}

#[async_trait]
impl FeedCatalog for Database {
    async fn find_by_query(&self, query: &str) -> Result<Vec<CatalogFeed>, SourceError> {
        Ok(self.search_popular_feeds(query).await?)
    }

    async fn find_by_category(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<CatalogFeed>, SourceError> {
        Ok(self.popular_feeds_by_category(category).await?)
    }

    async fn categories(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.popular_categories().await?)
    }
}
