//! OpenID Connect relying party
//!
//! Discovery, authorization URLs, code exchange, ID-token validation,
//! user-info and end-session URLs for a single authorization server.
//! Discovery and JWKS documents are fetched on first use and cached.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use sl_config::OidcConfig;

#[derive(Error, Debug)]
pub enum OidcError {
    #[error("OIDC discovery failed: {0}")]
    Discovery(String),

    #[error("OIDC request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Invalid ID token: {0}")]
    InvalidToken(String),

    #[error("User-info request failed: {0}")]
    UserInfo(String),
}

/// Provider discovery document (the fields this client uses)
#[derive(Debug, Clone, Deserialize)]
pub struct OidcDiscovery {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
    pub jwks_uri: String,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    pub keys: Vec<JwkKey>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwkKey {
    pub kty: String,
    pub kid: Option<String>,
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    pub n: Option<String>,
    pub e: Option<String>,
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Parameters of one authorization request
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationRequest<'a> {
    pub redirect_uri: &'a str,
    pub state: &'a str,
    pub nonce: &'a str,
    pub code_challenge: &'a str,
    /// Identity provider to route the user to
    pub idp: Option<&'a str>,
    /// Username to pre-fill at the provider
    pub login_hint: Option<&'a str>,
}

struct ProviderMetadata {
    discovery: OidcDiscovery,
    jwks: Jwks,
}

/// OIDC client for the configured authority
pub struct OidcClient {
    http: reqwest::Client,
    authority: String,
    client_id: String,
    client_secret: String,
    scopes: Vec<String>,
    metadata: RwLock<Option<Arc<ProviderMetadata>>>,
}

impl OidcClient {
    pub fn new(config: &OidcConfig) -> Result<Self, OidcError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self::with_http_client(config, http))
    }

    pub fn with_http_client(config: &OidcConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            authority: config.authority.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scopes: config.scopes.clone(),
            metadata: RwLock::new(None),
        }
    }

    async fn metadata(&self) -> Result<Arc<ProviderMetadata>, OidcError> {
        if let Some(cached) = self.metadata.read().await.as_ref() {
            return Ok(cached.clone());
        }

        let mut slot = self.metadata.write().await;
        if let Some(cached) = slot.as_ref() {
            return Ok(cached.clone());
        }

        let discovery = self.fetch_discovery().await?;
        let jwks = self.fetch_jwks(&discovery.jwks_uri).await?;
        let metadata = Arc::new(ProviderMetadata { discovery, jwks });
        *slot = Some(metadata.clone());
        Ok(metadata)
    }

    async fn fetch_discovery(&self) -> Result<OidcDiscovery, OidcError> {
        let url = format!("{}/.well-known/openid-configuration", self.authority);
        info!(url = %url, "Fetching OIDC discovery document");

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(OidcError::Discovery(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| OidcError::Discovery(format!("Failed to parse discovery document: {}", e)))
    }

    async fn fetch_jwks(&self, jwks_uri: &str) -> Result<Jwks, OidcError> {
        info!(jwks_uri, "Fetching JWKS");

        let response = self.http.get(jwks_uri).send().await?;
        if !response.status().is_success() {
            return Err(OidcError::Discovery(format!(
                "{} returned {}",
                jwks_uri,
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| OidcError::Discovery(format!("Failed to parse JWKS: {}", e)))
    }

    /// Re-fetch the key set after the provider rotated its signing keys.
    async fn refresh_jwks(&self) -> Result<Arc<ProviderMetadata>, OidcError> {
        let current = self.metadata().await?;
        let jwks = self.fetch_jwks(&current.discovery.jwks_uri).await?;
        let refreshed = Arc::new(ProviderMetadata {
            discovery: current.discovery.clone(),
            jwks,
        });
        *self.metadata.write().await = Some(refreshed.clone());
        Ok(refreshed)
    }

    /// Build the URL that sends the browser to the authorization endpoint.
    pub async fn authorization_url(
        &self,
        request: &AuthorizationRequest<'_>,
    ) -> Result<String, OidcError> {
        let metadata = self.metadata().await?;
        Ok(build_authorization_url(
            &metadata.discovery.authorization_endpoint,
            &self.client_id,
            &self.scopes,
            request,
        ))
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, OidcError> {
        let metadata = self.metadata().await?;

        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier),
        ];

        // Confidential clients authenticate with HTTP Basic, public ones name
        // themselves in the body.
        let mut request = self.http.post(&metadata.discovery.token_endpoint);
        if self.client_secret.is_empty() {
            params.push(("client_id", self.client_id.as_str()));
        } else {
            request = request.basic_auth(&self.client_id, Some(&self.client_secret));
        }
        let request = request.form(&params);

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(OidcError::TokenExchange(format!("{}: {}", status, error_text)));
        }

        response
            .json()
            .await
            .map_err(|e| OidcError::TokenExchange(format!("Failed to parse token response: {}", e)))
    }

    /// Validate an ID token's signature, issuer, audience, expiry and nonce,
    /// returning its claims.
    pub async fn validate_id_token(
        &self,
        id_token: &str,
        expected_nonce: &str,
    ) -> Result<Map<String, Value>, OidcError> {
        let header = decode_header(id_token)
            .map_err(|e| OidcError::InvalidToken(format!("Invalid header: {}", e)))?;

        let mut metadata = self.metadata().await?;
        let decoding_key = match find_decoding_key(&metadata.jwks, header.kid.as_deref())? {
            Some(key) => key,
            None => {
                warn!(kid = ?header.kid, "Signing key not in cached JWKS, refreshing");
                metadata = self.refresh_jwks().await?;
                find_decoding_key(&metadata.jwks, header.kid.as_deref())?.ok_or_else(|| {
                    OidcError::InvalidToken("No matching key found in JWKS".to_string())
                })?
            }
        };

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&metadata.discovery.issuer]);
        validation.set_audience(&[&self.client_id]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let claims = decode::<Map<String, Value>>(id_token, &decoding_key, &validation)
            .map_err(|e| OidcError::InvalidToken(e.to_string()))?
            .claims;

        if claims.get("nonce").and_then(Value::as_str) != Some(expected_nonce) {
            return Err(OidcError::InvalidToken("Nonce mismatch".to_string()));
        }

        Ok(claims)
    }

    /// Claims from the user-info endpoint. Empty when the provider has none.
    pub async fn user_info(&self, access_token: &str) -> Result<Map<String, Value>, OidcError> {
        let metadata = self.metadata().await?;
        let Some(endpoint) = metadata.discovery.userinfo_endpoint.as_deref() else {
            debug!("Provider has no user-info endpoint");
            return Ok(Map::new());
        };

        let response = self.http.get(endpoint).bearer_auth(access_token).send().await?;
        if !response.status().is_success() {
            return Err(OidcError::UserInfo(format!("returned {}", response.status())));
        }

        response
            .json()
            .await
            .map_err(|e| OidcError::UserInfo(format!("Failed to parse response: {}", e)))
    }

    /// URL ending the session at the provider, or `None` when the provider
    /// does not advertise an end-session endpoint.
    pub async fn end_session_url(
        &self,
        id_token_hint: Option<&str>,
        post_logout_redirect_uri: &str,
    ) -> Result<Option<String>, OidcError> {
        let metadata = self.metadata().await?;
        Ok(metadata
            .discovery
            .end_session_endpoint
            .as_deref()
            .map(|endpoint| build_end_session_url(endpoint, id_token_hint, post_logout_redirect_uri)))
    }
}

fn find_decoding_key(jwks: &Jwks, kid: Option<&str>) -> Result<Option<DecodingKey>, OidcError> {
    let key = jwks.keys.iter().find(|k| {
        k.kty == "RSA"
            && k.key_use.as_deref().map_or(true, |u| u == "sig")
            && kid.map_or(true, |kid| k.kid.as_deref() == Some(kid))
    });

    let Some(key) = key else {
        return Ok(None);
    };

    let n = key
        .n
        .as_deref()
        .ok_or_else(|| OidcError::InvalidToken("Missing 'n' in RSA key".to_string()))?;
    let e = key
        .e
        .as_deref()
        .ok_or_else(|| OidcError::InvalidToken("Missing 'e' in RSA key".to_string()))?;

    DecodingKey::from_rsa_components(n, e)
        .map(Some)
        .map_err(|e| OidcError::InvalidToken(format!("Invalid RSA key: {}", e)))
}

/// Authorization-code request URL with PKCE (S256).
pub fn build_authorization_url(
    authorization_endpoint: &str,
    client_id: &str,
    scopes: &[String],
    request: &AuthorizationRequest<'_>,
) -> String {
    let separator = if authorization_endpoint.contains('?') { '&' } else { '?' };
    let mut url = format!(
        "{}{}response_type=code&client_id={}&redirect_uri={}&scope={}&state={}&nonce={}&code_challenge={}&code_challenge_method=S256",
        authorization_endpoint,
        separator,
        urlencoding::encode(client_id),
        urlencoding::encode(request.redirect_uri),
        urlencoding::encode(&scopes.join(" ")),
        urlencoding::encode(request.state),
        urlencoding::encode(request.nonce),
        urlencoding::encode(request.code_challenge),
    );

    if let Some(idp) = request.idp.filter(|v| !v.is_empty()) {
        url.push_str(&format!("&idp={}", urlencoding::encode(idp)));
    }
    if let Some(hint) = request.login_hint.filter(|v| !v.is_empty()) {
        url.push_str(&format!("&login_hint={}", urlencoding::encode(hint)));
    }

    url
}

fn build_end_session_url(
    endpoint: &str,
    id_token_hint: Option<&str>,
    post_logout_redirect_uri: &str,
) -> String {
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    let mut url = format!(
        "{}{}post_logout_redirect_uri={}",
        endpoint,
        separator,
        urlencoding::encode(post_logout_redirect_uri)
    );
    if let Some(hint) = id_token_hint {
        url.push_str(&format!("&id_token_hint={}", urlencoding::encode(hint)));
    }
    url
}
