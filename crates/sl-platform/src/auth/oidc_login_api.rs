//! OIDC Sign-in Flow
//!
//! Browser-facing half of the authorization-code flow:
//!
//! 1. A handler calls [`SignInService::challenge`], which stores a pending
//!    challenge cookie and redirects to the authorization server, optionally
//!    naming an identity provider (`idp`) and a `login_hint`.
//! 2. The server redirects back to `/authorization-code/callback`, where
//!    the code is exchanged, the ID token validated, user-info claims merged
//!    and the session cookie issued.
//! 3. [`SignInService::sign_out`] clears the session and, when the provider
//!    supports it, ends the federated session too. The provider returns the
//!    browser to `/signout/callback`, which forwards to the stored target.

use axum::{
    extract::{Host, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};

use sl_config::HttpConfig;

use super::challenge::{sanitize_return_url, PendingChallenge};
use super::claims::{claim_types, principal_from_login, Principal};
use super::oidc_client::{AuthorizationRequest, OidcClient};
use super::session::{Session, SessionCookies};
use crate::shared::error::AppError;
use crate::shared::routes::Route;
use crate::shared::state::AppState;

/// What a challenge should ask the authorization server for
#[derive(Debug, Clone, Default)]
pub struct ChallengeOptions {
    /// Local URL to land on after sign-in
    pub return_url: String,
    pub idp: Option<String>,
    pub login_hint: Option<String>,
}

impl ChallengeOptions {
    pub fn new(return_url: impl Into<String>) -> Self {
        Self {
            return_url: return_url.into(),
            ..Self::default()
        }
    }

    pub fn with_idp(mut self, idp: Option<String>) -> Self {
        self.idp = idp.filter(|v| !v.is_empty());
        self
    }

    pub fn with_login_hint(mut self, login_hint: Option<String>) -> Self {
        self.login_hint = login_hint.filter(|v| !v.is_empty());
        self
    }
}

/// Query parameters on the authorization callback
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

pub struct SignInService {
    oidc: OidcClient,
    cookies: SessionCookies,
    external_base_url: Option<String>,
    custom_claims: Vec<String>,
}

impl SignInService {
    pub fn new(
        oidc: OidcClient,
        cookies: SessionCookies,
        http: &HttpConfig,
        custom_claims: Vec<String>,
    ) -> Self {
        let external_base_url = Some(http.external_base_url.trim().trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .map(String::from);
        Self {
            oidc,
            cookies,
            external_base_url,
            custom_claims,
        }
    }

    pub fn cookies(&self) -> &SessionCookies {
        &self.cookies
    }

    fn base_url(&self, host: &str) -> String {
        self.external_base_url.clone().unwrap_or_else(|| {
            let scheme = if self.cookies.is_secure() { "https" } else { "http" };
            format!("{}://{}", scheme, host)
        })
    }

    fn callback_url(&self, host: &str) -> String {
        format!("{}{}", self.base_url(host), Route::OidcCallback.path())
    }

    fn signed_out_url(&self, host: &str) -> String {
        format!("{}{}", self.base_url(host), Route::SignedOutCallback.path())
    }

    /// Send the browser to the authorization server.
    pub async fn challenge(
        &self,
        jar: PrivateCookieJar,
        host: &str,
        options: ChallengeOptions,
    ) -> Result<(PrivateCookieJar, Redirect), AppError> {
        let challenge = PendingChallenge::new(sanitize_return_url(Some(&options.return_url)));
        let code_challenge = challenge.code_challenge();
        let redirect_uri = self.callback_url(host);

        let url = self
            .oidc
            .authorization_url(&AuthorizationRequest {
                redirect_uri: &redirect_uri,
                state: &challenge.state,
                nonce: &challenge.nonce,
                code_challenge: &code_challenge,
                idp: options.idp.as_deref(),
                login_hint: options.login_hint.as_deref(),
            })
            .await?;

        info!(
            idp = ?options.idp,
            return_url = %challenge.return_url,
            "Starting OIDC challenge"
        );

        let jar = self.cookies.store_challenge(jar, &challenge)?;
        Ok((jar, Redirect::to(&url)))
    }

    /// Finish sign-in from the callback parameters and the pending challenge.
    pub async fn complete_sign_in(
        &self,
        jar: PrivateCookieJar,
        host: &str,
        challenge: Option<PendingChallenge>,
        params: CallbackParams,
    ) -> Result<(PrivateCookieJar, Redirect), AppError> {
        if let Some(error) = params.error {
            let description = params.error_description.unwrap_or_else(|| error.clone());
            warn!(error = %error, description = %description, "Authorization server returned an error");
            return Err(AppError::sign_in(description));
        }

        let challenge = challenge
            .ok_or_else(|| AppError::sign_in("Your sign-in session was not found. Please try again."))?;

        if challenge.is_expired_at(Utc::now().timestamp()) {
            return Err(AppError::sign_in("Your sign-in session expired. Please try again."));
        }

        let state = params
            .state
            .ok_or_else(|| AppError::sign_in("Missing state parameter."))?;
        if !challenge.matches_state(&state) {
            warn!("Callback state does not match the pending challenge");
            return Err(AppError::sign_in("Invalid sign-in state. Please try again."));
        }

        let code = params
            .code
            .ok_or_else(|| AppError::sign_in("Missing authorization code."))?;

        let tokens = self
            .oidc
            .exchange_code(&code, &challenge.code_verifier, &self.callback_url(host))
            .await?;
        let id_token = tokens
            .id_token
            .ok_or_else(|| AppError::sign_in("The authorization server did not return an ID token."))?;

        let id_claims = self.oidc.validate_id_token(&id_token, &challenge.nonce).await?;
        let user_info = self.oidc.user_info(&tokens.access_token).await?;
        let principal = principal_from_login(&id_claims, &user_info, &self.custom_claims);

        if principal.user_id().is_none() {
            return Err(AppError::missing_claim(claim_types::SUBJECT));
        }

        info!(user_id = ?principal.user_id(), "User signed in");

        let session = Session::new(principal, Some(id_token), self.cookies.lifetime_secs());
        let jar = self.cookies.start_session(jar, &session)?;
        Ok((jar, Redirect::to(&challenge.return_url)))
    }

    /// Clear the local session, then end the federated session and come back
    /// to `target`.
    pub async fn sign_out(
        &self,
        jar: PrivateCookieJar,
        host: &str,
        session: Option<&Session>,
        target: &str,
    ) -> Result<(PrivateCookieJar, Redirect), AppError> {
        let target = sanitize_return_url(Some(target));
        let jar = self.cookies.end_session(jar);

        let id_token_hint = session.and_then(|s| s.id_token.as_deref());
        match self
            .oidc
            .end_session_url(id_token_hint, &self.signed_out_url(host))
            .await?
        {
            Some(url) => {
                info!(user_id = ?session.and_then(|s| s.principal.user_id()), "Signing out of federated session");
                let jar = self.cookies.store_signout_target(jar, &target);
                Ok((jar, Redirect::to(&url)))
            }
            None => {
                debug!("Provider has no end-session endpoint");
                Ok((jar, Redirect::to(&target)))
            }
        }
    }

    /// Rebuild the session cookie after the principal changed.
    pub fn refresh_session(
        &self,
        jar: PrivateCookieJar,
        session: &Session,
        principal: Principal,
    ) -> Result<PrivateCookieJar, AppError> {
        let updated = Session {
            principal,
            ..session.clone()
        };
        self.cookies.start_session(jar, &updated)
    }
}

/// GET /authorization-code/callback
pub async fn oidc_callback(
    State(state): State<AppState>,
    Host(host): Host,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let (jar, challenge) = state.sign_in.cookies().take_challenge(jar);

    match state
        .sign_in
        .complete_sign_in(jar.clone(), &host, challenge, params)
        .await
    {
        Ok(signed_in) => signed_in.into_response(),
        Err(err) => (jar, err).into_response(),
    }
}

/// GET /signout/callback
pub async fn signed_out_callback(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Redirect) {
    let (jar, target) = state.sign_in.cookies().take_signout_target(jar);
    let target = sanitize_return_url(target.as_deref());
    debug!(target = %target, "Federated sign-out complete");
    (jar, Redirect::to(&target))
}
