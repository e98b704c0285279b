//! Anti-forgery tokens for form posts
//!
//! The token is kept in a private cookie and echoed in a hidden form field.
//! A post is accepted only when both are present and equal.

use axum_extra::extract::cookie::PrivateCookieJar;
use subtle::ConstantTimeEq;
use tracing::warn;

use super::challenge::generate_random_string;
use super::session::SessionCookies;
use crate::shared::error::AppError;

/// Hidden form field carrying the token
pub const FORM_FIELD: &str = "__RequestVerificationToken";

/// Token for a form being rendered; reuses the cookie's token when present.
pub fn issue_token(jar: PrivateCookieJar, cookies: &SessionCookies) -> (PrivateCookieJar, String) {
    if let Some(token) = cookies.antiforgery_token(&jar) {
        return (jar, token);
    }
    let token = generate_random_string(32);
    (cookies.store_antiforgery_token(jar, token.clone()), token)
}

/// Check a submitted token against the cookie.
pub fn verify_token(
    jar: &PrivateCookieJar,
    cookies: &SessionCookies,
    submitted: &str,
) -> Result<(), AppError> {
    let Some(expected) = cookies.antiforgery_token(jar) else {
        warn!("Form post without anti-forgery cookie");
        return Err(AppError::AntiForgery);
    };

    if submitted.is_empty() || !bool::from(expected.as_bytes().ct_eq(submitted.as_bytes())) {
        warn!("Anti-forgery token mismatch");
        return Err(AppError::AntiForgery);
    }

    Ok(())
}
