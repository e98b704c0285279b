//! Request Error Types

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::oidc_client::OidcError;
use crate::directory::DirectoryError;
use crate::shared::views::ErrorView;

#[derive(Error, Debug)]
pub enum AppError {
    /// The session exists but lacks a claim every session must carry
    #[error("Authenticated session is missing the '{claim}' claim")]
    MissingClaim { claim: &'static str },

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("OIDC error: {0}")]
    Oidc(#[from] OidcError),

    /// The authorization callback could not be completed
    #[error("Sign-in failed: {message}")]
    SignIn { message: String },

    #[error("Anti-forgery token validation failed")]
    AntiForgery,

    #[error("Failed to render view: {0}")]
    Template(#[from] askama::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    pub fn missing_claim(claim: &'static str) -> Self {
        Self::MissingClaim { claim }
    }

    pub fn sign_in(message: impl Into<String>) -> Self {
        Self::SignIn { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::AntiForgery
            | AppError::SignIn { .. }
            | AppError::Oidc(OidcError::InvalidToken(_) | OidcError::TokenExchange(_)) => {
                StatusCode::BAD_REQUEST
            }
            AppError::MissingClaim { .. }
            | AppError::Directory(_)
            | AppError::Oidc(_)
            | AppError::Template(_)
            | AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the user. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::AntiForgery => {
                "The form has expired or was not submitted from this site. Please try again."
                    .to_string()
            }
            AppError::SignIn { message } => message.clone(),
            AppError::Oidc(OidcError::InvalidToken(_) | OidcError::TokenExchange(_)) => {
                "Your sign-in could not be verified. Please try again.".to_string()
            }
            _ => "An error occurred while processing your request.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            warn!(error = %self, "Request rejected");
        }

        let view = ErrorView::new(status, self.public_message());
        match view.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                error!(error = %e, "Failed to render error page");
                (status, view.message).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::AntiForgery.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::sign_in("state").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::missing_claim("sub").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Directory(DirectoryError::from_response(500, b"")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rejected_tokens_are_bad_requests() {
        let err = AppError::from(OidcError::InvalidToken("InvalidAudience".to_string()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.public_message().contains("InvalidAudience"));

        let err = AppError::from(OidcError::Discovery("unreachable".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_details_are_not_shown() {
        let err = AppError::internal("database password is hunter2");
        assert!(!err.public_message().contains("hunter2"));
    }

    #[test]
    fn test_error_page_response() {
        let response = AppError::missing_claim("sub").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers()["content-type"],
            "text/html; charset=utf-8"
        );
    }
}
