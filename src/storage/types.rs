use chrono::{DateTime, Utc};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another gator process holds the database lock
    #[error("Another gator process appears to be using the database. Please stop it and try again.")]
    InstanceLocked,

    /// SQLite could not open or create the database file
    #[error("Unable to open database file. Check that the path exists and is writable.")]
    CannotOpen,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Insert rejected by a UNIQUE constraint
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(sqlx::Error),
}

impl DatabaseError {
    /// Classify a sqlx error: uniqueness conflicts, unopenable files and lock
    /// contention get their own variants, everything else is `Other`.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return DatabaseError::UniqueViolation(db_err.message().to_string());
            }
        }

        let message = err.to_string();
        if is_cant_open_message(&message) {
            return DatabaseError::CannotOpen;
        }
        if is_lock_message(&message) {
            return DatabaseError::InstanceLocked;
        }

        DatabaseError::Other(err)
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DatabaseError::UniqueViolation(_))
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        Self::from_sqlx(err)
    }
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6) mean some other process owns the file.
pub(crate) fn is_lock_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
}

/// SQLITE_CANTOPEN (14): missing directory, permissions, or not a file.
fn is_cant_open_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("unable to open database file") || message.contains("sqlite_cantopen")
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Feed row as stored. `last_fetched_at` is unix milliseconds; all other
/// timestamps are unix seconds.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Feed {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub user_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_fetched_at: Option<i64>,
    pub last_error: Option<String>,
}

/// Feed joined with the name of the user who added it (`feeds` listing)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedWithCreator {
    pub name: String,
    pub url: String,
    pub creator: Option<String>,
    pub last_fetched_at: Option<i64>,
    pub last_error: Option<String>,
}

/// A user's follow of a feed, with both names resolved
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FeedFollow {
    pub id: i64,
    pub user_id: i64,
    pub feed_id: i64,
    pub user_name: String,
    pub feed_name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub published_at: i64,
    pub feed_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Post {
    pub fn published(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.published_at, 0)
    }
}

/// Post joined with the feed it came from (`browse` listing)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostWithFeed {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: i64,
    pub feed_name: String,
}

// ============================================================================
// Ingestion Types
// ============================================================================

/// The slice of a feed the scheduler cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub id: i64,
    pub url: String,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl From<&Feed> for FeedSource {
    fn from(feed: &Feed) -> Self {
        Self {
            id: feed.id,
            url: feed.url.clone(),
            last_fetched_at: feed.last_fetched_at.and_then(DateTime::from_timestamp_millis),
        }
    }
}

/// A post ready to be inserted
#[derive(Debug, Clone)]
pub struct NewPost {
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub published_at: DateTime<Utc>,
    pub feed_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_messages_classified() {
        assert!(is_lock_message("error returned from database: (code: 5) database is locked"));
        assert!(is_lock_message("SQLITE_LOCKED"));
        assert!(!is_lock_message("unable to open database file"));
    }

    #[test]
    fn test_cant_open_is_not_a_lock() {
        let message = "error returned from database: (code: 14) unable to open database file";
        assert!(is_cant_open_message(message));
        assert!(!is_lock_message(message));
        assert!(!is_cant_open_message("database is locked"));
    }
}
