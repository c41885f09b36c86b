use chrono::Utc;
use thiserror::Error;

use super::selector::next_feed;
use super::FeedStore;
use crate::feed::{parse_pub_date, FeedClient, FetchError, RemoteItem};
use crate::storage::{DatabaseError, NewPost};

/// What one ingestion tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionResult {
    /// 0 when there were no feeds, otherwise 1
    pub feeds_processed: usize,
    pub items_seen: usize,
    pub items_inserted: usize,
    /// Items dropped for a bad date, a missing link or a storage error.
    /// Duplicates are not counted here.
    pub items_skipped: usize,
}

/// Failures that end a tick early. Per-item problems never surface here.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to select next feed: {0}")]
    Select(#[source] DatabaseError),

    #[error("Failed to mark feed {feed_id} as fetched: {source}")]
    MarkFetched {
        feed_id: i64,
        #[source]
        source: DatabaseError,
    },

    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        feed_id: i64,
        url: String,
        #[source]
        source: FetchError,
    },
}

enum ItemOutcome {
    Inserted,
    Duplicate,
    Skipped,
}

/// Runs one select → mark → fetch → persist cycle per call.
pub struct Ingester<S> {
    store: S,
    client: FeedClient,
}

impl<S: FeedStore> Ingester<S> {
    pub fn new(store: S, client: FeedClient) -> Self {
        Self { store, client }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Refresh the stalest feed.
    ///
    /// The feed is stamped as fetched before the HTTP request goes out, so a
    /// feed that keeps failing still drops to the back of the rotation.
    /// Items are stored one at a time; a bad item is logged and skipped
    /// without affecting its siblings, and a URL that is already stored is
    /// silently ignored.
    pub async fn run_once(&self) -> Result<IngestionResult, IngestError> {
        let Some(feed) = next_feed(&self.store).await.map_err(IngestError::Select)? else {
            tracing::debug!("No feeds registered, nothing to fetch");
            return Ok(IngestionResult::default());
        };

        self.store
            .mark_feed_fetched(feed.id, Utc::now())
            .await
            .map_err(|source| IngestError::MarkFetched {
                feed_id: feed.id,
                source,
            })?;

        let document = match self.client.fetch(&feed.url).await {
            Ok(document) => document,
            Err(source) => {
                self.remember_error(feed.id, Some(&source.to_string())).await;
                return Err(IngestError::Fetch {
                    feed_id: feed.id,
                    url: feed.url,
                    source,
                });
            }
        };
        self.remember_error(feed.id, None).await;

        tracing::info!(
            feed_id = feed.id,
            url = %feed.url,
            channel = %document.channel_title,
            items = document.items.len(),
            "Fetched feed"
        );

        let mut result = IngestionResult {
            feeds_processed: 1,
            ..Default::default()
        };
        for item in document.items {
            result.items_seen += 1;
            match self.persist_item(feed.id, item).await {
                ItemOutcome::Inserted => result.items_inserted += 1,
                ItemOutcome::Duplicate => {}
                ItemOutcome::Skipped => result.items_skipped += 1,
            }
        }

        tracing::info!(
            feed_id = feed.id,
            seen = result.items_seen,
            inserted = result.items_inserted,
            skipped = result.items_skipped,
            "Stored new posts"
        );
        Ok(result)
    }

    async fn persist_item(&self, feed_id: i64, item: RemoteItem) -> ItemOutcome {
        if item.link.is_empty() {
            tracing::warn!(feed_id, title = %item.title, "Skipping item without a link");
            return ItemOutcome::Skipped;
        }

        let published_at = match parse_pub_date(&item.pub_date) {
            Ok(published_at) => published_at,
            Err(e) => {
                tracing::warn!(feed_id, url = %item.link, error = %e, "Skipping item");
                return ItemOutcome::Skipped;
            }
        };

        let post = NewPost {
            url: item.link,
            title: item.title,
            description: item.description,
            published_at,
            feed_id,
        };

        match self.store.insert_post(&post).await {
            Ok(()) => {
                tracing::debug!(feed_id, url = %post.url, "Inserted post");
                ItemOutcome::Inserted
            }
            Err(e) if e.is_unique_violation() => {
                tracing::trace!(feed_id, url = %post.url, "Post already stored");
                ItemOutcome::Duplicate
            }
            Err(e) => {
                tracing::warn!(feed_id, url = %post.url, error = %e, "Failed to store post");
                ItemOutcome::Skipped
            }
        }
    }

    async fn remember_error(&self, feed_id: i64, error: Option<&str>) {
        if let Err(e) = self.store.record_fetch_error(feed_id, error).await {
            tracing::warn!(feed_id, error = %e, "Failed to record fetch status");
        }
    }
}
