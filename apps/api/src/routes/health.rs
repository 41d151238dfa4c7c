use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

pub const SERVICE_NAME: &str = "jobtrack-api";

/// GET /health
/// Returns a liveness object; does not touch the backend.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "service": SERVICE_NAME
    }))
}
