//! Okta-compatible identity-management client
//!
//! Thin REST client for the user and identity-provider endpoints this
//! application needs. Requests authenticate with `Authorization: SSWS <token>`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use sl_config::DirectoryConfig;

use super::collection::{next_link, Collection, Page};
use super::entity::{CreateUserRequest, IdentityProvider, UpdateUserRequest, User, UserProfile};
use super::error::DirectoryError;
use super::UserDirectory;

/// Identity-management API client. Cheap to clone.
#[derive(Clone)]
pub struct OktaClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    api_token: Arc<str>,
}

impl fmt::Debug for OktaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OktaClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OktaClient {
    pub fn new(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Self::with_http_client(&config.org_url, &config.api_token, http)
    }

    pub fn with_http_client(
        org_url: &str,
        api_token: &str,
        http: reqwest::Client,
    ) -> Result<Self, DirectoryError> {
        let base_url = org_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(DirectoryError::InvalidUrl(org_url.to_string()));
        }

        Ok(Self {
            http,
            base_url: Arc::from(base_url),
            api_token: Arc::from(api_token),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn user_url(&self, user_id: &str) -> String {
        self.url(&format!("/api/v1/users/{}", urlencoding::encode(user_id)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(AUTHORIZATION, format!("SSWS {}", self.api_token))
            .header(ACCEPT, "application/json")
    }

    async fn check(response: Response) -> Result<Response, DirectoryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await?;
        Err(DirectoryError::from_response(status.as_u16(), &body))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, DirectoryError> {
        let response = Self::check(self.authorize(request).send().await?).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Fetch one page of a collection.
    pub(crate) async fn fetch_page<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<Page<T>, DirectoryError> {
        // Never send the API token to a host other than the organization.
        let same_origin = url
            .strip_prefix(&*self.base_url)
            .is_some_and(|rest| rest.starts_with('/'));
        if !same_origin {
            return Err(DirectoryError::InvalidUrl(url.to_string()));
        }

        debug!(url, "Fetching directory page");
        let response = Self::check(self.authorize(self.http.get(url)).send().await?).await?;
        let next = next_link(response.headers());
        let body = response.bytes().await?;

        Ok(Page {
            items: serde_json::from_slice(&body)?,
            next,
        })
    }

    /// Lazily paged collection rooted at `path`.
    pub fn collection<T>(&self, path: &str) -> Collection<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        Collection::new(self.clone(), self.url(path))
    }

    /// Identity providers linked to a user, as a lazy collection.
    pub fn identity_providers(&self, user_id: &str) -> Collection<IdentityProvider> {
        self.collection(&format!(
            "/api/v1/users/{}/idps",
            urlencoding::encode(user_id)
        ))
    }
}

#[async_trait]
impl UserDirectory for OktaClient {
    async fn get_user(&self, user_id: &str) -> Result<User, DirectoryError> {
        debug!(user_id, "Fetching user");
        self.send_json(self.http.get(self.user_url(user_id))).await
    }

    async fn create_user(
        &self,
        request: CreateUserRequest,
        activate: bool,
    ) -> Result<User, DirectoryError> {
        debug!(login = %request.profile.login, activate, "Creating user");
        let url = self.url(&format!("/api/v1/users?activate={}", activate));
        self.send_json(self.http.post(url).json(&request)).await
    }

    async fn update_user_profile(
        &self,
        user_id: &str,
        profile: &UserProfile,
    ) -> Result<User, DirectoryError> {
        debug!(user_id, "Updating user profile");
        let body = UpdateUserRequest { profile };
        self.send_json(self.http.put(self.user_url(user_id)).json(&body))
            .await
    }

    async fn list_identity_providers(
        &self,
        user_id: &str,
    ) -> Result<Vec<IdentityProvider>, DirectoryError> {
        self.identity_providers(user_id).collect_all().await
    }
}
