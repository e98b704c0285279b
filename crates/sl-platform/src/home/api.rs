//! Home, error and health endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;

use crate::shared::middleware::OptionalAuth;
use crate::shared::routes::Route;
use crate::shared::state::AppState;
use crate::shared::views::{ErrorView, HomeView, HtmlTemplate, Nav, ProviderButton};

/// GET /
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(session): OptionalAuth,
) -> HtmlTemplate<HomeView> {
    let providers = state
        .social_providers
        .iter()
        .map(|p| ProviderButton {
            name: p.name.clone(),
            idp_id: p.idp_id.clone(),
        })
        .collect();

    HtmlTemplate(HomeView {
        nav: Nav::for_principal(session.as_ref().map(|s| &s.principal)),
        providers,
    })
}

/// GET /Home/Error
pub async fn error_page(OptionalAuth(session): OptionalAuth) -> Response {
    let mut view = ErrorView::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "An error occurred while processing your request.",
    );
    view.nav = Nav::for_principal(session.as_ref().map(|s| &s.principal));
    (StatusCode::INTERNAL_SERVER_ERROR, HtmlTemplate(view)).into_response()
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub fn home_router() -> Router<AppState> {
    Router::new()
        .route(Route::Home.path(), get(index))
        .route(Route::Error.path(), get(error_page))
        .route(Route::Health.path(), get(health))
}
