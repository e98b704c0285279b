//! Social Login Platform
//!
//! Server-rendered account site providing:
//! - Sign-in through a hosted OpenID Connect provider, optionally routed to
//!   a social identity provider
//! - Linking further social identity providers to an existing account
//! - Registration against the identity-management directory
//! - A profile-completion gate for users missing their rewards number
//!
//! ## Module Organization
//!
//! - `directory` - Identity-management API client and entities
//! - `auth` - OIDC relying party, cookie session, anti-forgery
//! - `profile` - Completion policy and gate middleware
//! - `account` / `home` - Pages and endpoints
//! - `shared` - State, errors, routes, middleware, views

// Remote systems
pub mod directory;

// Authentication
pub mod auth;

// Pages
pub mod account;
pub mod home;
pub mod profile;

// Shared infrastructure
pub mod shared;

mod app;

pub use app::{build_router, canonical_routing};
pub use shared::{AppError, AppState, Route, RouteAccess};
