use serde::Serialize;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Storage errors with user-facing messages
#[derive(Debug, Error)]
pub enum StorageError {
    /// Another process holds the database lock
    #[error("The feed database is locked by another process. Please try again.")]
    Locked,

    #[error("Database migration failed: {0}")]
    Migration(String),

    /// The user already follows this feed URL
    #[error("Already following {0}")]
    AlreadyFollowing(String),

    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl StorageError {
    /// Maps lock-related sqlx errors to [`StorageError::Locked`].
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5), SQLITE_LOCKED (6), SQLITE_CANTOPEN (14)
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return StorageError::Locked;
        }

        StorageError::Other(err)
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// What a user supplies to follow a feed. `feed_url` identifies the follow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowRequest {
    pub feed_url: String,
    pub title: String,
    pub description: Option<String>,
    /// `"RSS"` or `"Atom"` when known
    pub feed_type: Option<String>,
    pub favicon_url: Option<String>,
    pub category: Option<String>,
}

/// A stored follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FollowedFeed {
    pub id: i64,
    pub user_id: i64,
    pub feed_url: String,
    pub feed_title: String,
    pub feed_description: Option<String>,
    pub feed_type: Option<String>,
    pub favicon_url: Option<String>,
    pub category: Option<String>,
    /// SQLite `datetime('now')`, UTC
    pub created_at: String,
}

impl From<StorageError> for crate::sources::SourceError {
    fn from(err: StorageError) -> Self {
        crate::sources::SourceError::Storage(err.to_string())
    }
}
