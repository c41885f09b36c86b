use chrono::Utc;

use super::schema::Database;
use super::types::{DatabaseError, NewPost, Post, PostWithFeed};

impl Database {
    // ========================================================================
    // Post Operations
    // ========================================================================

    /// Insert a single post.
    ///
    /// Posts are immutable once stored: a URL that already exists is reported
    /// as `DatabaseError::UniqueViolation` and the stored row is left as is.
    pub async fn insert_post(&self, post: &NewPost) -> Result<(), DatabaseError> {
        let now = Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO posts (url, title, description, published_at, feed_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(&post.url)
        .bind(&post.title)
        .bind(&post.description)
        .bind(post.published_at.timestamp())
        .bind(post.feed_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_post_by_url(&self, url: &str) -> Result<Option<Post>, DatabaseError> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, url, title, description, published_at, feed_id, created_at, updated_at
            FROM posts
            WHERE url = ?
        "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    /// Posts of one feed, newest first
    pub async fn get_posts_for_feed(&self, feed_id: i64) -> Result<Vec<Post>, DatabaseError> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, url, title, description, published_at, feed_id, created_at, updated_at
            FROM posts
            WHERE feed_id = ?
            ORDER BY published_at DESC, id DESC
        "#,
        )
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    /// Newest posts across every feed the user follows
    pub async fn get_posts_for_user(
        &self,
        user_id: i64,
        limit: u32,
    ) -> Result<Vec<PostWithFeed>, DatabaseError> {
        let posts = sqlx::query_as::<_, PostWithFeed>(
            r#"
            SELECT p.title, p.url, p.description, p.published_at, f.name AS feed_name
            FROM posts p
            JOIN feeds f ON f.id = p.feed_id
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = ?
            ORDER BY p.published_at DESC, p.id DESC
            LIMIT ?
        "#,
        )
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }
}
