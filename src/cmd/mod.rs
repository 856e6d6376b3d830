pub mod backup;
pub mod help;

use crate::auth::SessionAuth;
use crate::config::AppConfig;
use anyhow::Result;

/// Runs a backup of `path` with the session credentials and configured
/// backup root.
pub fn run_backup(cfg: &AppConfig, path: &str) -> Result<backup::Outcome> {
    let auth = SessionAuth::new(cfg)?;
    tracing::debug!(session = %auth.session_path().display(), "using session auth");
    backup::run(&auth, cfg.backup_root(), path)
}
