//! Profile completion gate
//!
//! Middleware that keeps signed-in users with an incomplete profile on the
//! completion form. Runs after [`authenticate`](crate::shared::middleware::authenticate).

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::auth::session::Session;
use crate::shared::routes::{Route, RouteAccess};
use crate::shared::state::AppState;

pub async fn require_profile_completion(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(principal) = request
        .extensions()
        .get::<Session>()
        .map(|session| session.principal.clone())
    else {
        return next.run(request).await;
    };

    if Route::access_for_path(request.uri().path()) != RouteAccess::Gated {
        return next.run(request).await;
    }

    match state.policy.is_complete(&principal).await {
        Ok(true) => next.run(request).await,
        Ok(false) => {
            debug!(
                user_id = ?principal.user_id(),
                path = %request.uri().path(),
                "Profile incomplete, redirecting to completion form"
            );
            Redirect::to(Route::CompleteProfile.path()).into_response()
        }
        Err(err) => err.into_response(),
    }
}
