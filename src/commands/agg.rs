use anyhow::{Context, Result};

use super::AppContext;
use crate::aggregator::{start_aggregation, Ingester};
use crate::feed::FeedClient;

/// `gator agg <interval>`: runs until the process is killed.
pub(super) async fn aggregate(ctx: &AppContext, interval: &str) -> Result<()> {
    let client = FeedClient::new(ctx.config.fetch_timeout(), &ctx.config.user_agent)
        .context("Failed to build HTTP client")?;
    let ingester = Ingester::new(ctx.db.clone(), client);

    match start_aggregation(ingester, interval).await? {}
}
