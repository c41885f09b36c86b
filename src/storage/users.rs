use chrono::Utc;

use super::schema::Database;
use super::types::{DatabaseError, User};

impl Database {
    // ========================================================================
    // User Operations
    // ========================================================================

    /// Create a user. A taken name yields `DatabaseError::UniqueViolation`.
    pub async fn create_user(&self, name: &str) -> Result<User, DatabaseError> {
        let now = Utc::now().timestamp();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, created_at, updated_at)
            VALUES (?, ?, ?)
            RETURNING id, name, created_at, updated_at
        "#,
        )
        .bind(name)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_user(&self, name: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, created_at, updated_at FROM users WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// All users ordered by name
    pub async fn get_users(&self) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, name, created_at, updated_at FROM users ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::Database;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = test_db().await;
        let created = db.create_user("alice").await.unwrap();
        assert!(created.id > 0);
        assert_eq!(created.name, "alice");

        let fetched = db.get_user("alice").await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_get_missing_user_is_none() {
        let db = test_db().await;
        assert!(db.get_user("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_is_unique_violation() {
        let db = test_db().await;
        db.create_user("alice").await.unwrap();
        let err = db.create_user("alice").await.unwrap_err();
        assert!(err.is_unique_violation(), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_users_sorted_by_name() {
        let db = test_db().await;
        db.create_user("carol").await.unwrap();
        db.create_user("alice").await.unwrap();
        db.create_user("bob").await.unwrap();

        let names: Vec<String> = db
            .get_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }
}
