//! Authentication middleware and extractors

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;

use crate::auth::session::Session;
use crate::shared::routes::Route;
use crate::shared::state::AppState;

/// Resolve the session cookie and attach the [`Session`] to the request.
///
/// Requests without a valid session continue unauthenticated.
pub async fn authenticate(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(session) = state.cookies.read_session(&jar) {
        request.extensions_mut().insert(session);
    }
    next.run(request).await
}

/// Extractor for handlers that require a signed-in user.
///
/// Anonymous requests are redirected to the login page, which returns them
/// here afterwards.
pub struct Authenticated(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(Authenticated)
            .ok_or_else(|| login_redirect(&parts.uri))
    }
}

/// Extractor for handlers that behave differently for signed-in users.
pub struct OptionalAuth(pub Option<Session>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(parts.extensions.get::<Session>().cloned()))
    }
}

fn login_redirect(uri: &Uri) -> Response {
    let return_url = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    Redirect::to(&format!(
        "{}?returnUrl={}",
        Route::Login.path(),
        urlencoding::encode(return_url)
    ))
    .into_response()
}
