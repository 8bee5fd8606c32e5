//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::services::ServeDir;

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{auth_middleware, track_metrics};
use crate::presentation::websocket::ws_handler;
use crate::startup::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes(state.clone()))
        // WebSocket gateway endpoint; authentication happens in-protocol
        .route("/gateway", get(ws_handler))
        // Attachments are served from the same tree the store writes to
        .nest_service("/static", ServeDir::new(state.storage.root()))
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        // Record request count and latency per matched route
        .layer(middleware::from_fn(track_metrics))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}

/// API v1 routes (all protected)
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/chats", chat_routes(state.clone()))
        .nest("/messages", message_routes(state))
}

/// Chat routes (protected)
fn chat_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::chat::list_chats))
        .route("/users", get(handlers::chat::list_available_users))
        .route("/direct/{peer_id}", post(handlers::chat::create_direct_chat))
        .route("/group", post(handlers::chat::create_group_chat))
        .route("/group/{chat_id}", get(handlers::chat::get_group_chat))
        .route("/group/{chat_id}", patch(handlers::chat::rename_group_chat))
        .route("/group/{chat_id}", delete(handlers::chat::delete_group_chat))
        .route(
            "/group/{chat_id}/{participant_id}",
            post(handlers::chat::add_participant),
        )
        .route(
            "/group/{chat_id}/{participant_id}",
            delete(handlers::chat::remove_participant),
        )
        .route(
            "/leave/group/{chat_id}",
            delete(handlers::chat::leave_group_chat),
        )
        .route("/remove/{chat_id}", delete(handlers::chat::delete_direct_chat))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Message routes (protected)
fn message_routes(state: AppState) -> Router<AppState> {
    // The whole multipart body, attachments included, must fit the limit
    let body_limit =
        state.settings.storage.max_file_size * handlers::message::MAX_ATTACHMENTS + 1024 * 1024;

    Router::new()
        .route("/{chat_id}", get(handlers::message::get_messages))
        .route("/{chat_id}", post(handlers::message::send_message))
        .layer(DefaultBodyLimit::max(body_limit))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
