//! The `gator` command line: argument parsing, dispatch and handlers.
//!
//! Handlers write their output to a caller-supplied writer (stdout in the
//! binary, a buffer in tests). Commands that act on behalf of the logged-in
//! user are wrapped with [`with_current_user`], which resolves the user
//! before the handler runs.

mod agg;
mod browse;
mod context;
mod feeds;
mod users;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;

use crate::storage::User;

pub use context::AppContext;

#[derive(Parser, Debug)]
#[command(name = "gator", version, about = "RSS feed aggregator for the terminal")]
pub struct Cli {
    /// Config file (default: ~/.config/gator/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a user and log in as them
    Register { name: String },
    /// Switch to an existing user
    Login { name: String },
    /// List all users
    Users,
    /// Delete every user, feed, follow and post
    Reset,
    /// Fetch feeds forever, one feed per interval (e.g. 30s, 1m, 1h)
    Agg {
        #[arg(value_name = "TIME_BETWEEN_REQS")]
        interval: String,
    },
    /// Register a feed and follow it
    #[command(name = "addfeed")]
    AddFeed { name: String, url: String },
    /// List all registered feeds
    Feeds,
    /// Follow a registered feed by URL
    Follow { url: String },
    /// List the feeds you follow
    Following,
    /// Stop following a feed
    Unfollow { url: String },
    /// Show the newest posts from feeds you follow
    Browse {
        #[arg(default_value_t = 2)]
        limit: u32,
    },
}

/// Resolve the logged-in user, then run `handler` with it.
///
/// Fails without calling `handler` when nobody is logged in or the
/// configured user no longer exists (e.g. after `reset`).
pub async fn with_current_user<'a, A, F, Fut>(
    ctx: &'a AppContext,
    out: &'a mut dyn Write,
    args: A,
    handler: F,
) -> Result<()>
where
    F: FnOnce(&'a AppContext, &'a mut dyn Write, User, A) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let name = ctx
        .config
        .current_user_name
        .as_deref()
        .context("Not logged in: run `gator register <name>` or `gator login <name>` first")?;

    let user = ctx
        .db
        .get_user(name)
        .await?
        .with_context(|| format!("Current user {name} does not exist; log in again"))?;

    handler(ctx, out, user, args).await
}

/// Run one command to completion (`agg` never completes on success).
pub async fn run(ctx: &mut AppContext, command: Command, out: &mut dyn Write) -> Result<()> {
    tracing::debug!(?command, "Running command");

    match command {
        Command::Register { name } => users::register(ctx, out, &name).await,
        Command::Login { name } => users::login(ctx, out, &name).await,
        Command::Users => users::list(ctx, out).await,
        Command::Reset => users::reset(ctx, out).await,
        Command::Agg { interval } => agg::aggregate(ctx, &interval).await,
        Command::AddFeed { name, url } => {
            with_current_user(ctx, out, (name, url), feeds::add_feed).await
        }
        Command::Feeds => feeds::list(ctx, out).await,
        Command::Follow { url } => with_current_user(ctx, out, url, feeds::follow).await,
        Command::Following => with_current_user(ctx, out, (), feeds::following).await,
        Command::Unfollow { url } => with_current_user(ctx, out, url, feeds::unfollow).await,
        Command::Browse { limit } => with_current_user(ctx, out, limit, browse::browse).await,
    }
}
