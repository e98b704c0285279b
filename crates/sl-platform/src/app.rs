//! Router assembly

use axum::{extract::Request, middleware::from_fn_with_state, Router};
use tower::{util::MapRequestLayer, Layer};
use tower_http::trace::TraceLayer;

use crate::account::account_router;
use crate::auth::oidc_login_api::{oidc_callback, signed_out_callback};
use crate::home::home_router;
use crate::profile::require_profile_completion;
use crate::shared::middleware::authenticate;
use crate::shared::routes::{canonicalize_request, Route};
use crate::shared::state::AppState;

/// Every page and endpoint, behind session resolution and the profile gate.
///
/// Layers run outermost first: tracing, then [`authenticate`], then the gate.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(home_router())
        .merge(account_router())
        .route(Route::OidcCallback.path(), axum::routing::get(oidc_callback))
        .route(
            Route::SignedOutCallback.path(),
            axum::routing::get(signed_out_callback),
        )
        .layer(from_fn_with_state(state.clone(), require_profile_completion))
        .layer(from_fn_with_state(state.clone(), authenticate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wrap the router so known paths match regardless of case.
pub fn canonical_routing(
    router: Router,
) -> tower::util::MapRequest<Router, fn(Request) -> Request> {
    MapRequestLayer::new(canonicalize_request as fn(Request) -> Request).layer(router)
}
