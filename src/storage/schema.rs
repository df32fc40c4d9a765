use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::StorageError;

// ============================================================================
// Database
// ============================================================================

/// SQLite store for the popular-feed catalog and per-user follows.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations
    ///
    /// `":memory:"` opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Locked` if another process holds the database
    /// lock (SQLITE_BUSY, SQLITE_LOCKED, SQLITE_CANTOPEN).
    /// Returns `StorageError::Migration` if the schema cannot be created.
    pub async fn open(path: &str) -> Result<Self, StorageError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // SEC-010: Create the file owner-only before SQLite touches it
        #[cfg(unix)]
        if path != ":memory:" {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            let db_path = std::path::Path::new(path);
            if db_path.exists() {
                let perms = std::fs::Permissions::from_mode(0o600);
                if let Err(e) = std::fs::set_permissions(path, perms) {
                    tracing::warn!(path = %path, error = %e, "Failed to set database file permissions");
                }
            } else if db_path.parent().is_some_and(|p| p.as_os_str().is_empty() || p.exists()) {
                // If creation fails, SQLite reports the error at connect_with
                let _file = std::fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .mode(0o600)
                    .open(db_path)
                    .ok();
            }
        }

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(StorageError::from_sqlx)?
            .pragma("busy_timeout", "5000");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(StorageError::from_sqlx)?;

        let db = Self { pool };
        db.migrate()
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))?;
        tracing::debug!(path = %path, "Database ready");
        Ok(db)
    }

    /// Creates the schema inside one transaction. Every statement is
    /// `IF NOT EXISTS`, so re-running on an existing database is a no-op.
    async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Curated feeds offered by discovery
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS popular_feeds (
                id INTEGER PRIMARY KEY,
                feed_url TEXT UNIQUE NOT NULL,
                site_url TEXT,
                title TEXT NOT NULL,
                description TEXT,
                favicon_url TEXT,
                category TEXT,
                subscriber_count INTEGER,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_popular_feeds_category ON popular_feeds(category)",
        )
        .execute(&mut *tx)
        .await?;

        // One row per (user, feed_url) follow
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_feeds (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                feed_url TEXT NOT NULL,
                feed_title TEXT NOT NULL,
                feed_description TEXT,
                feed_type TEXT,
                favicon_url TEXT,
                category TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(user_id, feed_url)
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_user_feeds_user ON user_feeds(user_id)")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
