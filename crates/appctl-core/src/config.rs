//! ============================================================================
//! Controller Configuration
//! ============================================================================
//! Defaults match the web client: checks every 5 minutes, banners visible
//! for 5 seconds. Every value can be overridden from the environment.
//! ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Default server origin for the risk calculator app
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Default interval between recurring access checks (5 minutes)
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 300;

/// Default time a warning banner stays visible
pub const DEFAULT_BANNER_SECS: u64 = 5;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Server origin, without trailing slash
    pub base_url: String,
    pub check_interval: Duration,
    pub banner_duration: Duration,
    pub request_timeout: Duration,
    /// Contact address sent on registration (may be empty)
    pub email: String,
    /// Local storage database path; `None` means `~/.appctl/local.redb`
    pub db_path: Option<PathBuf>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            check_interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            banner_duration: Duration::from_secs(DEFAULT_BANNER_SECS),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            email: String::new(),
            db_path: None,
        }
    }
}

impl ControllerConfig {
    /// Build from `APPCTL_*` environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("APPCTL_BASE_URL") {
            config = config.with_base_url(&url);
        }
        if let Some(secs) = parse_secs(&lookup, "APPCTL_CHECK_INTERVAL_SECS") {
            config.check_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_secs(&lookup, "APPCTL_BANNER_SECS") {
            config.banner_duration = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_secs(&lookup, "APPCTL_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(email) = lookup("APPCTL_EMAIL") {
            config.email = email;
        }
        config.db_path = lookup("APPCTL_DB_PATH").map(PathBuf::from);

        config
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Absolute URL for a server path such as `/api/register/`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn parse_secs<F>(lookup: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(0) => {
            warn!("{} must be positive, ignoring", key);
            None
        }
        Ok(secs) => Some(secs),
        Err(e) => {
            warn!("Invalid {}='{}': {} - using default", key, raw, e);
            None
        }
    }
}
