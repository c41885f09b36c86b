use anyhow::{bail, Context, Result};
use chrono::DateTime;
use std::io::Write;

use super::AppContext;
use crate::storage::{Feed, User};
use crate::util::{strip_control_chars, validate_feed_url};

pub(super) async fn add_feed(
    ctx: &AppContext,
    out: &mut dyn Write,
    user: User,
    (name, url): (String, String),
) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Feed name must not be empty");
    }
    let url = url.trim();
    validate_feed_url(url).with_context(|| format!("Refusing to add {url}"))?;

    let feed = match ctx.db.create_feed(name, url, user.id).await {
        Ok(feed) => feed,
        Err(e) if e.is_unique_violation() => bail!("A feed with URL {url} is already registered; use `gator follow {url}`"),
        Err(e) => return Err(e).context("Failed to create feed"),
    };
    ctx.db
        .create_feed_follow(user.id, feed.id)
        .await
        .context("Feed created but following it failed")?;

    tracing::info!(feed_id = feed.id, url = %feed.url, user = %user.name, "Added feed");
    writeln!(out, "Added feed {}", feed.name)?;
    writeln!(out, "  url:   {}", feed.url)?;
    writeln!(out, "  owner: {}", user.name)?;
    writeln!(out, "{} now follows {}", user.name, feed.name)?;
    Ok(())
}

pub(super) async fn list(ctx: &AppContext, out: &mut dyn Write) -> Result<()> {
    let feeds = ctx.db.get_feeds_with_creators().await?;
    if feeds.is_empty() {
        writeln!(out, "No feeds registered yet")?;
        return Ok(());
    }

    for feed in feeds {
        writeln!(out, "* {}", strip_control_chars(&feed.name))?;
        writeln!(out, "  url:          {}", feed.url)?;
        writeln!(out, "  added by:     {}", feed.creator.as_deref().unwrap_or("-"))?;
        let fetched = feed
            .last_fetched_at
            .and_then(DateTime::from_timestamp_millis)
            .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string());
        writeln!(out, "  last fetched: {}", fetched)?;
        if let Some(error) = &feed.last_error {
            writeln!(out, "  last error:   {}", strip_control_chars(error))?;
        }
    }
    Ok(())
}

async fn registered_feed(ctx: &AppContext, url: &str) -> Result<Feed> {
    ctx.db
        .get_feed_by_url(url)
        .await?
        .with_context(|| format!("No feed registered with URL {url}; add it with `gator addfeed`"))
}

pub(super) async fn follow(
    ctx: &AppContext,
    out: &mut dyn Write,
    user: User,
    url: String,
) -> Result<()> {
    let feed = registered_feed(ctx, url.trim()).await?;

    let follow = match ctx.db.create_feed_follow(user.id, feed.id).await {
        Ok(follow) => follow,
        Err(e) if e.is_unique_violation() => bail!("{} already follows {}", user.name, feed.name),
        Err(e) => return Err(e).context("Failed to follow feed"),
    };

    writeln!(out, "{} now follows {}", follow.user_name, follow.feed_name)?;
    Ok(())
}

pub(super) async fn following(
    ctx: &AppContext,
    out: &mut dyn Write,
    user: User,
    (): (),
) -> Result<()> {
    let follows = ctx.db.get_feed_follows_for_user(user.id).await?;
    if follows.is_empty() {
        writeln!(out, "{} is not following any feeds", user.name)?;
        return Ok(());
    }
    for follow in follows {
        writeln!(out, "* {}", strip_control_chars(&follow.feed_name))?;
    }
    Ok(())
}

pub(super) async fn unfollow(
    ctx: &AppContext,
    out: &mut dyn Write,
    user: User,
    url: String,
) -> Result<()> {
    let feed = registered_feed(ctx, url.trim()).await?;

    if !ctx.db.delete_feed_follow(user.id, feed.id).await? {
        bail!("{} is not following {}", user.name, feed.name);
    }
    writeln!(out, "{} unfollowed {}", user.name, feed.name)?;
    Ok(())
}
