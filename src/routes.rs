// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::get,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{report, view},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Mounts the quiz report and module view pages behind login.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store and configuration).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = [state.config.wwwroot.as_str(), "http://127.0.0.1:3000"]
        .iter()
        .filter_map(|origin| origin.trim_end_matches('/').parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    // Every page requires login
    let page_routes = Router::new()
        .route(
            "/mod/quiz/report",
            get(report::show_report).post(report::submit_report),
        )
        .route("/mod/thesis/view", get(view::view_module))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(page_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
