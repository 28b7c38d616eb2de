//! Top-level router assembly: `/api` routes, middleware layers, and the
//! embedded UI fallback.

use axum::Router;
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::shared::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(crate::auth::configure_auth_routes())
        .merge(crate::api::configure_api_routes());

    Router::new()
        .nest("/api", api)
        .with_state(state)
        .merge(crate::embedded_ui::embedded_ui_router())
        .layer(CookieManagerLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
