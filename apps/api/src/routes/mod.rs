pub mod health;

use std::any::Any;
use std::path::Path;

use axum::{
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::errors::AppError;
use crate::state::AppState;
use crate::views::handlers;

async fn api_not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No API route for {}", uri.path()))
}

/// Uncaught panics become a generic JSON 500.
fn panic_response(_err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "INTERNAL_ERROR",
            "message": "An internal server error occurred"
        })),
    )
        .into_response()
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/v1/views/:collection", get(handlers::handle_view))
        .route("/v1/views/:collection/actions", post(handlers::handle_action))
        .route("/v1/views/:collection/export", post(handlers::handle_export))
        .route("/v1/views/:collection/summary", get(handlers::handle_summary))
        .route("/v1/views/:collection/fields", get(handlers::handle_fields))
        .route("/v1/collections/:collection", post(handlers::handle_create))
        .route(
            "/v1/collections/:collection/:id",
            put(handlers::handle_update).delete(handlers::handle_delete),
        )
        .fallback(api_not_found)
}

/// `/health`, the JSON API under `/api`, and the client bundle for every other path.
pub fn build_router(state: AppState) -> Router {
    let static_dir = Path::new(&state.config.static_dir).to_path_buf();
    let index = static_dir.join("index.html");

    Router::new()
        .route("/health", get(health::health_handler))
        .nest("/api", api_router())
        .fallback_service(ServeDir::new(static_dir).fallback(ServeFile::new(index)))
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}
