use std::time::Duration;

use axum::http::header::InvalidHeaderValue;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::rate_limit;
use crate::state::AppState;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const BODY_LIMIT_BYTES: usize = 64 * 1024;

pub fn router(state: AppState, allowed_origin: Option<&str>) -> Result<Router, InvalidHeaderValue> {
    let cors = match allowed_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    };

    let api = Router::new()
        .route("/status", get(handlers::status))
        .route("/translate", post(handlers::translate))
        .route("/kanji", post(handlers::kanji))
        .route("/grammar", post(handlers::grammar))
        .route("/chat", post(handlers::chat))
        .route("/examples", post(handlers::examples))
        .route("/test", post(handlers::probe))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::middleware,
        ));

    Ok(Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(cors)
        .with_state(state))
}
