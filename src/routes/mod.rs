use axum::{middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::{
        auth_guard::{require_session, require_session_edge},
        locale::handle_locale,
    },
    state::AppState,
};

mod admin;
mod auth;
mod investor;
mod meetings;
mod pages;

/// Build the complete application.
///
/// The locale middleware and the edge session gate wrap the whole router as a
/// service rather than as route layers: a Spanish page request is rewritten to
/// `/es/...` before routing, so the rewrite decides which route matches.
pub fn app(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes(state.clone()))
        .merge(pages::router())
        .with_state(state.clone());

    let edge = ServiceBuilder::new()
        .layer(middleware::from_fn(handle_locale))
        .layer(middleware::from_fn_with_state(state, require_session_edge))
        .service(routes);

    Router::new()
        .fallback_service(edge)
        .layer(CookieManagerLayer::new())   // must wrap everything reading cookies
        .layer(CorsLayer::permissive())     // tighten in production
        .layer(TraceLayer::new_for_http())
}

/// Build the `/api` router.
///
/// Sign-in, callback, sign-out and meeting booking are public; everything
/// else is wrapped in [`require_session`], and admin routes additionally
/// check the founder allow-list.
fn api_routes(state: AppState) -> Router<AppState> {
    let session_mw = middleware::from_fn_with_state(state.clone(), require_session);
    Router::new()
        .merge(auth::public_router())
        .merge(meetings::router())
        .merge(
            Router::new()
                .merge(auth::router())
                .merge(investor::router())
                .merge(admin::router(state))
                .route_layer(session_mw),
        )
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
