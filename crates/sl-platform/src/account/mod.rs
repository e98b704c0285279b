//! Account pages: sign-in flows, registration, profile completion, manage

pub mod api;
pub mod forms;

pub use api::account_router;
