//! Social Login Configuration System
//!
//! TOML-based configuration with environment variable override support.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub oidc: OidcConfig,
    pub directory: DirectoryConfig,
    pub session: SessionConfig,

    /// Social identity providers offered on the login and manage pages
    pub social_providers: Vec<SocialProviderConfig>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
    /// Public base URL used to build OIDC redirect URIs.
    /// Empty means "derive from the request Host header".
    pub external_base_url: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            host: "0.0.0.0".to_string(),
            external_base_url: String::new(),
        }
    }
}

/// OpenID Connect client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OidcConfig {
    /// Issuer / authorization server URL, e.g. `https://dev-123.okta.com/oauth2/default`
    pub authority: String,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
    /// Non-standard user-info claims copied into the session at sign-in
    pub custom_claims: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for OidcConfig {
    fn default() -> Self {
        Self {
            authority: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            scopes: vec!["openid".to_string(), "profile".to_string(), "email".to_string()],
            custom_claims: vec!["rewardsNumber".to_string()],
            request_timeout_secs: 30,
        }
    }
}

/// Identity-management (user directory) API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Organization base URL, e.g. `https://dev-123.okta.com`
    pub org_url: String,
    pub api_token: String,
    pub request_timeout_secs: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            org_url: String::new(),
            api_token: String::new(),
            request_timeout_secs: 30,
        }
    }
}

/// Session cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub secure: bool,
    pub same_site: String,
    /// Secret used to derive the cookie encryption key (at least 32 characters).
    /// Empty generates a random key at startup.
    pub secret: String,
    pub expiry_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sl_session".to_string(),
            secure: true,
            same_site: "Lax".to_string(),
            secret: String::new(),
            expiry_secs: 28800, // 8 hours
        }
    }
}

/// A social identity provider registered with the authorization server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SocialProviderConfig {
    /// Display name, e.g. "Facebook"
    pub name: String,
    /// Provider type as reported by the directory, e.g. "FACEBOOK"
    pub kind: String,
    /// Identity provider id passed as the `idp` authorization parameter
    pub idp_id: String,
}

/// Minimum length of `session.secret` when set
pub const MIN_SESSION_SECRET_LEN: usize = 32;

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Check that every setting the server cannot run without is present
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.oidc.authority.trim().is_empty() {
            missing.push("oidc.authority");
        }
        if self.oidc.client_id.trim().is_empty() {
            missing.push("oidc.client_id");
        }
        if self.directory.org_url.trim().is_empty() {
            missing.push("directory.org_url");
        }
        if self.directory.api_token.trim().is_empty() {
            missing.push("directory.api_token");
        }
        if !missing.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        if !self.session.secret.is_empty() && self.session.secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::ValidationError(format!(
                "session.secret must be at least {} characters",
                MIN_SESSION_SECRET_LEN
            )));
        }

        for provider in &self.social_providers {
            if provider.idp_id.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "social provider '{}' has no idp_id",
                    provider.name
                )));
            }
        }

        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# Social Login Example Configuration
# Environment variables (SOCIAL_LOGIN_*) override these settings

[http]
port = 5000
host = "0.0.0.0"
external_base_url = ""   # e.g. "https://app.example.com"; empty = use Host header

[oidc]
authority = "https://dev-123456.okta.com/oauth2/default"
client_id = ""
client_secret = ""
scopes = ["openid", "profile", "email"]
custom_claims = ["rewardsNumber"]
request_timeout_secs = 30

[directory]
org_url = "https://dev-123456.okta.com"
api_token = ""
request_timeout_secs = 30

[session]
cookie_name = "sl_session"
secure = true
same_site = "Lax"
secret = ""              # at least 32 characters; empty = random per process
expiry_secs = 28800

[[social_providers]]
name = "Facebook"
kind = "FACEBOOK"
idp_id = "0oa0000000000000000"

[[social_providers]]
name = "Google"
kind = "GOOGLE"
idp_id = "0oa0000000000000001"
"#
        .to_string()
    }
}
