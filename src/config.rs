use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BACKUP_ROOT: &str = "BackupFolder2023";
pub const DEFAULT_DRIVE_BASE_URL: &str = "https://www.googleapis.com";
pub const DEFAULT_UPLOAD_BASE_URL: &str = "https://www.googleapis.com";
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct AppConfig {
    /// Name of the top-level remote folder everything is placed under.
    #[serde(default)]
    pub backup_root: Option<String>,
    #[serde(default)]
    pub session_path: Option<PathBuf>,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub drive_base_url: Option<String>,
    #[serde(default)]
    pub upload_base_url: Option<String>,
    /// tracing filter directive, e.g. "info" or "drivebackup=debug".
    #[serde(default)]
    pub log: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        let cfg = Self::load_from(&path)?;
        Ok(cfg.with_env_overrides(|key| env::var(key).ok()))
    }

    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }

    fn with_env_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = var("DRIVEBACKUP_BACKUP_ROOT") {
            self.backup_root = Some(v);
        }
        if let Some(v) = var("DRIVEBACKUP_DRIVE_BASE_URL") {
            self.drive_base_url = Some(v);
        }
        if let Some(v) = var("DRIVEBACKUP_UPLOAD_BASE_URL") {
            self.upload_base_url = Some(v);
        }
        if let Some(v) = var("DRIVEBACKUP_LOG") {
            self.log = Some(v);
        }
        self
    }

    pub fn backup_root(&self) -> &str {
        self.backup_root
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_BACKUP_ROOT)
    }

    pub fn drive_base_url(&self) -> &str {
        self.drive_base_url
            .as_deref()
            .unwrap_or(DEFAULT_DRIVE_BASE_URL)
    }

    pub fn upload_base_url(&self) -> &str {
        self.upload_base_url
            .as_deref()
            .unwrap_or(DEFAULT_UPLOAD_BASE_URL)
    }

    pub fn log_filter(&self) -> &str {
        self.log.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    pub fn session_path(&self) -> Result<PathBuf> {
        match &self.session_path {
            Some(p) => Ok(expand_tilde(&p.to_string_lossy())),
            None => Ok(app_dir()?.join("session.json")),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(app_dir()?.join("config.toml"))
}

fn app_dir() -> Result<PathBuf> {
    let base = home_config_dir().ok_or_else(|| anyhow!("unable to locate config dir"))?;
    Ok(base.join("drivebackup"))
}

/// Returns ~/.config on all platforms instead of platform-specific config dirs.
fn home_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".config"))
}

/// Expands a leading `~` or `~/` to the home directory. Other forms
/// (`~user`) are returned unchanged.
pub fn expand_tilde(path: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (path, home) {
        ("~", Some(h)) => h,
        (p, Some(h)) if p.starts_with("~/") => h.join(&p[2..]),
        (p, _) => PathBuf::from(p),
    }
}
