//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "social-login.toml",
    "./config/config.toml",
    "/etc/social-login/config.toml",
];

/// Environment variable naming an explicit config file
const CONFIG_PATH_VAR: &str = "SOCIAL_LOGIN_CONFIG";

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        apply_overrides(&mut config, |key| env::var(key).ok());

        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var(CONFIG_PATH_VAR) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply `SOCIAL_LOGIN_*` overrides using `lookup` to read variables.
pub(crate) fn apply_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    // HTTP
    if let Some(port) = lookup("SOCIAL_LOGIN_HTTP_PORT").and_then(|v| v.parse().ok()) {
        config.http.port = port;
    }
    if let Some(val) = lookup("SOCIAL_LOGIN_HTTP_HOST") {
        config.http.host = val;
    }
    if let Some(val) = lookup("SOCIAL_LOGIN_EXTERNAL_BASE_URL") {
        config.http.external_base_url = val;
    }

    // OIDC
    if let Some(val) = lookup("SOCIAL_LOGIN_OIDC_AUTHORITY") {
        config.oidc.authority = val;
    }
    if let Some(val) = lookup("SOCIAL_LOGIN_OIDC_CLIENT_ID") {
        config.oidc.client_id = val;
    }
    if let Some(val) = lookup("SOCIAL_LOGIN_OIDC_CLIENT_SECRET") {
        config.oidc.client_secret = val;
    }
    if let Some(val) = lookup("SOCIAL_LOGIN_OIDC_SCOPES") {
        config.oidc.scopes = split_list(&val);
    }
    if let Some(val) = lookup("SOCIAL_LOGIN_OIDC_CUSTOM_CLAIMS") {
        config.oidc.custom_claims = split_list(&val);
    }

    // Directory
    if let Some(val) = lookup("SOCIAL_LOGIN_DIRECTORY_ORG_URL") {
        config.directory.org_url = val;
    }
    if let Some(val) = lookup("SOCIAL_LOGIN_DIRECTORY_API_TOKEN") {
        config.directory.api_token = val;
    }
    if let Some(timeout) = lookup("SOCIAL_LOGIN_DIRECTORY_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        config.directory.request_timeout_secs = timeout;
    }

    // Session
    if let Some(val) = lookup("SOCIAL_LOGIN_SESSION_SECRET") {
        config.session.secret = val;
    }
    if let Some(val) = lookup("SOCIAL_LOGIN_SESSION_COOKIE_NAME") {
        config.session.cookie_name = val;
    }
    if let Some(val) = lookup("SOCIAL_LOGIN_SESSION_SECURE") {
        config.session.secure = val.parse().unwrap_or(true);
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c| c == ',' || c == ' ')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
