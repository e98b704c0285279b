//! Shared application state

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use tracing::warn;

use sl_config::{AppConfig, SocialProviderConfig};

use crate::auth::oidc_client::OidcClient;
use crate::auth::oidc_login_api::SignInService;
use crate::auth::session::SessionCookies;
use crate::directory::{OktaClient, UserDirectory};
use crate::profile::ProfileCompletionPolicy;
use crate::shared::error::AppError;

/// State handed to every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn UserDirectory>,
    pub policy: ProfileCompletionPolicy,
    pub sign_in: Arc<SignInService>,
    pub cookies: SessionCookies,
    pub cookie_key: Key,
    pub social_providers: Arc<[SocialProviderConfig]>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        directory: Arc<dyn UserDirectory>,
        oidc: OidcClient,
    ) -> Self {
        let cookies = SessionCookies::new(&config.session);
        let sign_in = SignInService::new(
            oidc,
            cookies.clone(),
            &config.http,
            config.oidc.custom_claims.clone(),
        );

        Self {
            policy: ProfileCompletionPolicy::new(directory.clone()),
            directory,
            sign_in: Arc::new(sign_in),
            cookies,
            cookie_key: cookie_key(&config.session.secret),
            social_providers: config.social_providers.clone().into(),
        }
    }

    /// State backed by the real directory and OIDC clients.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let directory = Arc::new(OktaClient::new(&config.directory)?);
        let oidc = OidcClient::new(&config.oidc)?;
        Ok(Self::new(config, directory, oidc))
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Cookie encryption key derived from the configured secret.
///
/// An empty secret yields a random key, so sessions do not survive restarts.
pub fn cookie_key(secret: &str) -> Key {
    if secret.is_empty() {
        warn!("No session secret configured, using a random cookie key");
        return Key::generate();
    }
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}
