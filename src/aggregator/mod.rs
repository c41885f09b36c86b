//! The feed ingestion loop.
//!
//! Each tick picks the stalest feed ([`selector`]), stamps it as fetched,
//! downloads and parses it, and stores every new item as a post
//! ([`pipeline`]). [`driver`] fires ticks on a fixed interval forever.
//!
//! Storage is reached only through [`FeedStore`], so the loop never depends
//! on the CLI-side tables (users, follows).

pub mod driver;
pub mod pipeline;
pub mod selector;

use chrono::{DateTime, Utc};

use crate::storage::{Database, DatabaseError, FeedSource, NewPost};

pub use driver::{run, start_aggregation, Interval, Tick};
pub use pipeline::{IngestError, IngestionResult, Ingester};

/// The storage operations the ingestion loop needs.
///
/// `insert_post` must report a duplicate URL as
/// [`DatabaseError::UniqueViolation`]; the pipeline treats that as a no-op.
#[allow(async_fn_in_trait)]
pub trait FeedStore {
    async fn select_stalest_feed(&self) -> Result<Option<FeedSource>, DatabaseError>;

    async fn mark_feed_fetched(&self, feed_id: i64, at: DateTime<Utc>)
        -> Result<(), DatabaseError>;

    async fn insert_post(&self, post: &NewPost) -> Result<(), DatabaseError>;

    /// Remember (or clear, with `None`) why the last fetch failed.
    async fn record_fetch_error(
        &self,
        feed_id: i64,
        error: Option<&str>,
    ) -> Result<(), DatabaseError>;
}

impl FeedStore for Database {
    async fn select_stalest_feed(&self) -> Result<Option<FeedSource>, DatabaseError> {
        Database::select_stalest_feed(self).await
    }

    async fn mark_feed_fetched(
        &self,
        feed_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        Database::mark_feed_fetched(self, feed_id, at).await
    }

    async fn insert_post(&self, post: &NewPost) -> Result<(), DatabaseError> {
        Database::insert_post(self, post).await
    }

    async fn record_fetch_error(
        &self,
        feed_id: i64,
        error: Option<&str>,
    ) -> Result<(), DatabaseError> {
        self.set_feed_error(feed_id, error).await
    }
}
