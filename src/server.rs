use crate::constants::{RELAY_ALIAS_PATH, RELAY_PATH};
use crate::health;
use crate::logging::request_id_middleware;
use crate::types::ReplyBody;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// `POST /relay`: `{systemPrompt?, messages}` in, `{reply}` or `{error, status?, type?}` out.
///
/// Bodies over the size limit are answered in the same failure shape.
pub async fn relay_handler(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    let start = std::time::Instant::now();
    let result = match body {
        Ok(body) => state.relay.handle_body(&body).await,
        Err(rejection) => Err(state
            .relay
            .reject_body(rejection.status().as_u16(), &rejection.body_text())),
    };
    let latency_ms = start.elapsed().as_millis();

    match result {
        Ok(reply) => {
            tracing::info!(latency_ms = %latency_ms, "Relay turn completed");
            Json(ReplyBody { reply }).into_response()
        }
        Err(e) => {
            tracing::info!(latency_ms = %latency_ms, kind = ?e.kind(), "Relay turn failed");
            e.into_response()
        }
    }
}

pub fn build_router(state: Arc<AppState>, max_body_size: usize) -> Router {
    Router::new()
        .route(RELAY_PATH, post(relay_handler))
        .route(RELAY_ALIAS_PATH, post(relay_handler))
        .route("/health", get(health::liveness))
        .route("/readyz", get(health::readiness))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
