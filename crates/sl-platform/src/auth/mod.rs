//! Authentication
//!
//! - `claims`: the signed-in principal and claim mapping at sign-in
//! - `oidc_client`: relying-party calls to the authorization server
//! - `oidc_login_api`: challenge, callback and sign-out flow
//! - `challenge`: pending challenge state and PKCE helpers
//! - `session`: private-cookie session storage
//! - `antiforgery`: form post tokens

pub mod antiforgery;
pub mod challenge;
pub mod claims;
pub mod oidc_client;
pub mod oidc_login_api;
pub mod session;

pub use claims::{claim_types, Claim, Principal};
pub use oidc_client::{OidcClient, OidcError};
pub use oidc_login_api::{ChallengeOptions, SignInService};
pub use session::{Session, SessionCookies};
