use chrono::Utc;

use super::schema::Database;
use super::types::{DatabaseError, FeedFollow};

impl Database {
    // ========================================================================
    // Feed Follow Operations
    // ========================================================================

    /// Follow a feed. Following the same feed twice is a `UniqueViolation`.
    pub async fn create_feed_follow(
        &self,
        user_id: i64,
        feed_id: i64,
    ) -> Result<FeedFollow, DatabaseError> {
        let now = Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO feed_follows (user_id, feed_id, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
        "#,
        )
        .bind(user_id)
        .bind(feed_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let follow = sqlx::query_as::<_, FeedFollow>(
            r#"
            SELECT ff.id, ff.user_id, ff.feed_id, u.name AS user_name, f.name AS feed_name
            FROM feed_follows ff
            JOIN users u ON u.id = ff.user_id
            JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.id = ?
        "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(follow)
    }

    /// Feeds followed by a user, ordered by feed name
    pub async fn get_feed_follows_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<FeedFollow>, DatabaseError> {
        let follows = sqlx::query_as::<_, FeedFollow>(
            r#"
            SELECT ff.id, ff.user_id, ff.feed_id, u.name AS user_name, f.name AS feed_name
            FROM feed_follows ff
            JOIN users u ON u.id = ff.user_id
            JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.user_id = ?
            ORDER BY f.name, ff.id
        "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(follows)
    }

    /// Remove a follow. Returns `false` if the user was not following the feed.
    pub async fn delete_feed_follow(
        &self,
        user_id: i64,
        feed_id: i64,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = ? AND feed_id = ?")
            .bind(user_id)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
