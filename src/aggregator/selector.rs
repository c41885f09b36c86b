use chrono::Utc;

use super::FeedStore;
use crate::storage::{DatabaseError, FeedSource};

/// Pick the feed to refresh next.
///
/// Never-fetched feeds win, then the oldest `last_fetched_at`, then the
/// lowest id. Because the pipeline stamps the chosen feed before fetching,
/// repeated calls rotate through every feed without an explicit queue.
/// `Ok(None)` means there is nothing registered yet.
pub async fn next_feed<S: FeedStore>(store: &S) -> Result<Option<FeedSource>, DatabaseError> {
    let feed = store.select_stalest_feed().await?;

    if let Some(feed) = &feed {
        match feed.last_fetched_at {
            Some(at) => tracing::debug!(
                feed_id = feed.id,
                url = %feed.url,
                stale_secs = (Utc::now() - at).num_seconds(),
                "Selected stalest feed"
            ),
            None => tracing::debug!(feed_id = feed.id, url = %feed.url, "Selected never-fetched feed"),
        }
    }

    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use chrono::{Duration, TimeZone};

    async fn seed(db: &Database, names: &[&str]) -> Vec<i64> {
        let user = db.create_user("owner").await.unwrap();
        let mut ids = Vec::new();
        for name in names {
            let feed = db
                .create_feed(name, &format!("https://{}.example.com/rss", name), user.id)
                .await
                .unwrap();
            ids.push(feed.id);
        }
        ids
    }

    #[tokio::test]
    async fn test_no_feeds_is_none() {
        let db = Database::open(":memory:").await.unwrap();
        assert!(next_feed(&db).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_staleness_ordering_a_then_b_then_c() {
        let db = Database::open(":memory:").await.unwrap();
        let ids = seed(&db, &["a", "b", "c"]).await;
        let (a, b, c) = (ids[0], ids[1], ids[2]);

        let t1 = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let t2 = t1 + Duration::minutes(5);
        FeedStore::mark_feed_fetched(&db, b, t1).await.unwrap();
        FeedStore::mark_feed_fetched(&db, c, t2).await.unwrap();

        let mut order = Vec::new();
        for _ in 0..3 {
            let feed = next_feed(&db).await.unwrap().unwrap();
            order.push(feed.id);
            FeedStore::mark_feed_fetched(&db, feed.id, Utc::now())
                .await
                .unwrap();
        }
        assert_eq!(order, vec![a, b, c]);
    }

    #[tokio::test]
    async fn test_rotation_is_fair() {
        let db = Database::open(":memory:").await.unwrap();
        let ids = seed(&db, &["a", "b", "c"]).await;

        // Explicit, strictly increasing stamps so the test does not depend on
        // wall-clock resolution
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let mut order = Vec::new();
        for step in 0..6 {
            let feed = next_feed(&db).await.unwrap().unwrap();
            order.push(feed.id);
            FeedStore::mark_feed_fetched(&db, feed.id, start + Duration::seconds(step))
                .await
                .unwrap();
        }
        assert_eq!(order, vec![ids[0], ids[1], ids[2], ids[0], ids[1], ids[2]]);
    }
}
