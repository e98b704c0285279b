//! Server-rendered views
//!
//! Askama templates under `templates/`. Every page extends `layout.html`,
//! which reads the `nav` field for the signed-in user's name.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::account::forms::FieldErrors;
use crate::auth::claims::Principal;
use crate::directory::IdentityProvider;
use crate::shared::error::AppError;

/// Wraps a template so handlers can return it directly.
pub struct HtmlTemplate<T>(pub T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => AppError::from(err).into_response(),
        }
    }
}

/// Navigation bar state
#[derive(Debug, Clone, Default)]
pub struct Nav {
    pub user_name: Option<String>,
}

impl Nav {
    pub fn for_principal(principal: Option<&Principal>) -> Self {
        Self {
            user_name: principal.map(|p| p.display_name().unwrap_or("Account").to_string()),
        }
    }

    pub fn signed_in(&self) -> bool {
        self.user_name.is_some()
    }
}

/// Sign-in button for a configured social provider
#[derive(Debug, Clone)]
pub struct ProviderButton {
    pub name: String,
    pub idp_id: String,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct HomeView {
    pub nav: Nav,
    pub providers: Vec<ProviderButton>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorView {
    pub nav: Nav,
    pub status: u16,
    pub message: String,
}

impl ErrorView {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            nav: Nav::default(),
            status: status.as_u16(),
            message: message.into(),
        }
    }
}

/// Values echoed back into the registration form. Passwords never are.
#[derive(Debug, Clone, Default)]
pub struct RegisterFields {
    pub email: String,
    pub given_name: String,
    pub surname: String,
    pub rewards_number: String,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterView {
    pub nav: Nav,
    pub fields: RegisterFields,
    pub errors: FieldErrors,
    pub error: Option<String>,
    pub antiforgery_token: String,
}

#[derive(Template)]
#[template(path = "register_thanks.html")]
pub struct RegisterThanksView {
    pub nav: Nav,
}

#[derive(Template)]
#[template(path = "complete_profile.html")]
pub struct CompleteProfileView {
    pub nav: Nav,
    pub rewards_number: String,
    pub errors: FieldErrors,
    pub error: Option<String>,
    pub antiforgery_token: String,
}

/// Link state of one configured social provider on the manage page
#[derive(Debug, Clone)]
pub struct ProviderLinkState {
    pub name: String,
    pub idp_id: String,
    pub linked: bool,
}

#[derive(Template)]
#[template(path = "manage.html")]
pub struct ManageView {
    pub nav: Nav,
    pub email: String,
    pub rewards_number: Option<String>,
    pub linked: Vec<IdentityProvider>,
    pub providers: Vec<ProviderLinkState>,
}
