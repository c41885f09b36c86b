use anyhow::Result;
use chrono::DateTime;
use std::io::Write;

use super::AppContext;
use crate::storage::User;
use crate::util::{one_line_preview, strip_control_chars};

const PREVIEW_WIDTH: usize = 160;

pub(super) async fn browse(
    ctx: &AppContext,
    out: &mut dyn Write,
    user: User,
    limit: u32,
) -> Result<()> {
    let posts = ctx.db.get_posts_for_user(user.id, limit).await?;
    if posts.is_empty() {
        writeln!(out, "No posts yet. Follow some feeds and run `gator agg`.")?;
        return Ok(());
    }

    for (i, post) in posts.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        let published = DateTime::from_timestamp(post.published_at, 0)
            .map(|at| at.format("%a, %d %b %Y %H:%M UTC").to_string())
            .unwrap_or_default();

        writeln!(out, "{}", strip_control_chars(&post.title))?;
        writeln!(out, "  {} | {}", strip_control_chars(&post.feed_name), published)?;
        writeln!(out, "  {}", strip_control_chars(&post.url))?;
        if let Some(description) = &post.description {
            let preview = one_line_preview(&strip_control_chars(description), PREVIEW_WIDTH);
            if !preview.is_empty() {
                writeln!(out, "  {}", preview)?;
            }
        }
    }
    Ok(())
}
