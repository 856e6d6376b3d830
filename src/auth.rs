use crate::config::AppConfig;
use crate::drive::{DriveClient, DriveConfig};
use crate::store::RemoteStore;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const ACCESS_TOKEN_ENV: &str = "DRIVEBACKUP_ACCESS_TOKEN";

/// Hands out an authenticated remote store. Token acquisition and refresh
/// happen elsewhere; a provider either returns a usable store or fails.
pub trait AuthProvider {
    type Store: RemoteStore;

    fn connect(&self) -> Result<Self::Store>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    pub expires_at_unix: i64,
}

impl SessionToken {
    pub fn is_expired(&self, now_unix: i64) -> bool {
        now_unix >= self.expires_at_unix
    }
}

/// Reads the access token from the environment or from the session file
/// written by the external OAuth flow.
pub struct SessionAuth {
    session_path: PathBuf,
    env_token: Option<String>,
    drive: DriveConfig,
}

impl SessionAuth {
    pub fn new(cfg: &AppConfig) -> Result<Self> {
        Ok(Self {
            session_path: cfg.session_path()?,
            env_token: std::env::var(ACCESS_TOKEN_ENV)
                .ok()
                .filter(|t| !t.trim().is_empty()),
            drive: DriveConfig::from_app(cfg),
        })
    }

    pub fn session_path(&self) -> &Path {
        &self.session_path
    }

    pub fn load_session(&self) -> Result<Option<SessionToken>> {
        if !self.session_path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.session_path).with_context(|| {
            format!(
                "failed to read session file {}",
                self.session_path.display()
            )
        })?;
        let token: SessionToken =
            serde_json::from_str(&raw).context("failed to parse session json")?;
        Ok(Some(token))
    }

    fn access_token(&self, now_unix: i64) -> Result<String> {
        if let Some(token) = &self.env_token {
            tracing::debug!("using access token from {}", ACCESS_TOKEN_ENV);
            return Ok(token.clone());
        }

        let session = self.load_session()?.ok_or_else(|| {
            anyhow!(
                "not logged in: no session at {} (or set {})",
                self.session_path.display(),
                ACCESS_TOKEN_ENV
            )
        })?;
        if session.is_expired(now_unix) {
            return Err(anyhow!(
                "session at {} has expired; re-run the login flow",
                self.session_path.display()
            ));
        }
        Ok(session.access_token)
    }
}

impl AuthProvider for SessionAuth {
    type Store = DriveClient;

    fn connect(&self) -> Result<DriveClient> {
        let token = self.access_token(now_unix())?;
        DriveClient::new(self.drive.clone(), token)
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
