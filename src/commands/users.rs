use anyhow::{bail, Context, Result};
use std::io::Write;

use super::AppContext;

pub(super) async fn register(ctx: &mut AppContext, out: &mut dyn Write, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("User name must not be empty");
    }

    let user = match ctx.db.create_user(name).await {
        Ok(user) => user,
        Err(e) if e.is_unique_violation() => bail!("User {name} already exists"),
        Err(e) => return Err(e).context("Failed to create user"),
    };

    ctx.config
        .set_user(&user.name, &ctx.config_path)
        .context("Failed to save current user to config")?;

    tracing::info!(user_id = user.id, name = %user.name, "Registered user");
    writeln!(out, "User {} created and logged in", user.name)?;
    Ok(())
}

pub(super) async fn login(ctx: &mut AppContext, out: &mut dyn Write, name: &str) -> Result<()> {
    let name = name.trim();
    let Some(user) = ctx.db.get_user(name).await? else {
        bail!("User {name} does not exist");
    };

    ctx.config
        .set_user(&user.name, &ctx.config_path)
        .context("Failed to save current user to config")?;

    writeln!(out, "Logged in as {}", user.name)?;
    Ok(())
}

pub(super) async fn list(ctx: &AppContext, out: &mut dyn Write) -> Result<()> {
    let current = ctx.config.current_user_name.as_deref();
    for user in ctx.db.get_users().await? {
        if Some(user.name.as_str()) == current {
            writeln!(out, "* {} (current)", user.name)?;
        } else {
            writeln!(out, "* {}", user.name)?;
        }
    }
    Ok(())
}

/// Wipe all data. The config keeps pointing at the old user, so the next
/// authenticated command fails until someone registers or logs in again.
pub(super) async fn reset(ctx: &AppContext, out: &mut dyn Write) -> Result<()> {
    ctx.db.reset().await.context("Failed to reset database")?;
    tracing::info!("Database reset");
    writeln!(out, "Database reset")?;
    Ok(())
}
