use axum::extract::DefaultBodyLimit;
use axum::{middleware, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::dispatch::dispatch_middleware;

use super::frontend::with_frontend;
use super::{handlers, openapi, AppState};

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route(
            "/ocr",
            get(handlers::ocr_status).post(handlers::extract_text),
        )
        .route("/openapi.json", get(openapi::openapi_json))
        .merge(openapi::redoc_router())
        .layer(DefaultBodyLimit::max(state.config.server.body_limit_bytes));

    let router = Router::new().nest("/api", api);
    let router = with_frontend(router, state.config.server.static_dir.as_deref());

    router
        .layer(middleware::from_fn_with_state(
            state.clone(),
            dispatch_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
