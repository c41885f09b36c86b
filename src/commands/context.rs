use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::storage::Database;

/// Everything a command handler can reach: the store, the loaded config and
/// where that config lives (so `register`/`login` can write it back).
///
/// Built once per process and closed before exit.
pub struct AppContext {
    pub db: Database,
    pub config: Config,
    pub config_path: PathBuf,
}

impl AppContext {
    pub fn new(db: Database, config: Config, config_path: PathBuf) -> Self {
        Self {
            db,
            config,
            config_path,
        }
    }

    /// Load the config at `config_path` and open the database it points to,
    /// creating missing directories on the way.
    pub async fn open(config_path: PathBuf) -> Result<Self> {
        if let Some(dir) = config_path.parent() {
            ensure_private_dir(dir)?;
        }

        let config = Config::load(&config_path).with_context(|| {
            format!("Failed to load config from {}", config_path.display())
        })?;

        let db_path = config.resolve_db_path(&config_path);
        if let Some(dir) = db_path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir).with_context(|| {
                    format!("Failed to create database directory {}", dir.display())
                })?;
            }
        }
        let db_path_str = db_path
            .to_str()
            .context("Database path is not valid UTF-8")?;
        let db = Database::open(db_path_str)
            .await
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

        tracing::debug!(config = %config_path.display(), db = %db_path.display(), "Opened gator");
        Ok(Self::new(db, config, config_path))
    }

    pub async fn close(self) {
        self.db.close().await;
    }
}

/// Create `dir` user-only (0700 on Unix) if it does not exist yet.
/// Existing directories are left alone.
fn ensure_private_dir(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() || dir.exists() {
        return Ok(());
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create config directory {}", dir.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700)) {
            tracing::warn!(
                path = %dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }
    Ok(())
}
