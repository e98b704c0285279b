//! Identity-management directory
//!
//! The remote system of record for users, their profiles and their linked
//! identity providers. Handlers and the profile policy depend on the
//! [`UserDirectory`] trait; [`OktaClient`] is the HTTP implementation.

pub mod collection;
pub mod entity;
pub mod error;
pub mod okta;

use async_trait::async_trait;

pub use collection::Collection;
pub use entity::{CreateUserRequest, IdentityProvider, User, UserProfile, REWARDS_NUMBER};
pub use error::DirectoryError;
pub use okta::OktaClient;

/// User-directory operations used by the application
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch a user by id.
    async fn get_user(&self, user_id: &str) -> Result<User, DirectoryError>;

    /// Create a user, optionally activating it immediately.
    async fn create_user(
        &self,
        request: CreateUserRequest,
        activate: bool,
    ) -> Result<User, DirectoryError>;

    /// Replace a user's profile.
    async fn update_user_profile(
        &self,
        user_id: &str,
        profile: &UserProfile,
    ) -> Result<User, DirectoryError>;

    /// Every identity provider linked to a user, across all pages.
    async fn list_identity_providers(
        &self,
        user_id: &str,
    ) -> Result<Vec<IdentityProvider>, DirectoryError>;
}
