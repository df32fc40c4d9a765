use async_trait::async_trait;
use std::collections::HashSet;

use super::schema::Database;
use super::types::{FollowRequest, FollowedFeed, StorageError};
use crate::sources::{FollowStore, SourceError};

impl Database {
    // ========================================================================
    // Follow Operations
    // ========================================================================

    /// Records that `user_id` follows `request.feed_url`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AlreadyFollowing`] when the follow exists.
    pub async fn follow_feed(
        &self,
        user_id: i64,
        request: &FollowRequest,
    ) -> Result<FollowedFeed, StorageError> {
        let inserted = sqlx::query_as::<_, FollowedFeed>(
            r#"
            INSERT INTO user_feeds
                (user_id, feed_url, feed_title, feed_description, feed_type, favicon_url, category)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, feed_url) DO NOTHING
            RETURNING id, user_id, feed_url, feed_title, feed_description, feed_type,
                      favicon_url, category, created_at
        "#,
        )
        .bind(user_id)
        .bind(&request.feed_url)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.feed_type)
        .bind(&request.favicon_url)
        .bind(&request.category)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(feed) => {
                tracing::info!(user_id, feed_url = %feed.feed_url, "Followed feed");
                Ok(feed)
            }
            None => Err(StorageError::AlreadyFollowing(request.feed_url.clone())),
        }
    }

    /// Removes a follow. Returns whether one existed.
    pub async fn unfollow_feed(&self, user_id: i64, feed_url: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM user_feeds WHERE user_id = ? AND feed_url = ?")
            .bind(user_id)
            .bind(feed_url)
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            tracing::info!(user_id, feed_url = %feed_url, "Unfollowed feed");
        } else {
            tracing::warn!(user_id, feed_url = %feed_url, "Feed not followed, nothing to unfollow");
        }
        Ok(removed)
    }

    pub async fn is_following(&self, user_id: i64, feed_url: &str) -> Result<bool, StorageError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM user_feeds WHERE user_id = ? AND feed_url = ?)",
        )
        .bind(user_id)
        .bind(feed_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// The user's follows, newest first.
    pub async fn followed_feeds(&self, user_id: i64) -> Result<Vec<FollowedFeed>, StorageError> {
        let feeds = sqlx::query_as::<_, FollowedFeed>(
            r#"
            SELECT id, user_id, feed_url, feed_title, feed_description, feed_type,
                   favicon_url, category, created_at
            FROM user_feeds
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
        "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(feeds)
    }
}

#[async_trait]
impl FollowStore for Database {
    async fn followed_urls(&self, user_id: i64) -> Result<HashSet<String>, SourceError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT feed_url FROM user_feeds WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(url,)| url).collect())
    }
}
