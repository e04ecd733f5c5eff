use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::AppState;

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" })))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let channels: Vec<String> = state
        .engine
        .channel_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    (StatusCode::OK, Json(json!({ "status": "ok", "channels": channels })))
}

pub async fn health_db(State(state): State<AppState>) -> Response {
    match state.engine.store().ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "store": "ok" }))).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "store": format!("error: {e}") })),
        )
            .into_response(),
    }
}
