use chrono::{DateTime, Utc};

use super::schema::Database;
use super::types::{DatabaseError, Feed, FeedSource, FeedWithCreator};

const FEED_COLUMNS: &str =
    "id, name, url, user_id, created_at, updated_at, last_fetched_at, last_error";

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Register a feed owned by `user_id`. A URL that is already registered
    /// yields `DatabaseError::UniqueViolation`.
    pub async fn create_feed(
        &self,
        name: &str,
        url: &str,
        user_id: i64,
    ) -> Result<Feed, DatabaseError> {
        let now = Utc::now().timestamp();
        let feed = sqlx::query_as::<_, Feed>(&format!(
            r#"
            INSERT INTO feeds (name, url, user_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {FEED_COLUMNS}
        "#
        ))
        .bind(name)
        .bind(url)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(feed)
    }

    pub async fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>, DatabaseError> {
        let feed = sqlx::query_as::<_, Feed>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds WHERE url = ?"
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(feed)
    }

    /// All feeds with the name of the user who added them, ordered by name
    pub async fn get_feeds_with_creators(&self) -> Result<Vec<FeedWithCreator>, DatabaseError> {
        let feeds = sqlx::query_as::<_, FeedWithCreator>(
            r#"
            SELECT f.name, f.url, u.name AS creator, f.last_fetched_at, f.last_error
            FROM feeds f
            LEFT JOIN users u ON u.id = f.user_id
            ORDER BY f.name, f.id
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(feeds)
    }

    /// The feed that has waited longest for a refresh.
    ///
    /// Never-fetched feeds come first, then the oldest `last_fetched_at`;
    /// ties go to the lowest id (insertion order). `None` when no feeds exist.
    pub async fn select_stalest_feed(&self) -> Result<Option<FeedSource>, DatabaseError> {
        let feed = sqlx::query_as::<_, Feed>(&format!(
            r#"
            SELECT {FEED_COLUMNS}
            FROM feeds
            ORDER BY last_fetched_at ASC NULLS FIRST, id ASC
            LIMIT 1
        "#
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(feed.as_ref().map(FeedSource::from))
    }

    /// Stamp a feed as fetched at `at`.
    ///
    /// The stored value only moves forward: an `at` older than the current
    /// stamp leaves it unchanged. A missing feed is `sqlx::Error::RowNotFound`.
    pub async fn mark_feed_fetched(
        &self,
        feed_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE feeds
            SET last_fetched_at = MAX(COALESCE(last_fetched_at, 0), ?),
                updated_at = ?
            WHERE id = ?
        "#,
        )
        .bind(at.timestamp_millis())
        .bind(Utc::now().timestamp())
        .bind(feed_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::Other(sqlx::Error::RowNotFound));
        }
        Ok(())
    }

    /// Set or clear the last fetch error for a feed
    pub async fn set_feed_error(
        &self,
        feed_id: i64,
        error: Option<&str>,
    ) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE feeds SET last_error = ? WHERE id = ?")
            .bind(error)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
