use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::EngineError,
    models::AlertStatus,
    services::{alert_monitor, alerts_service},
    AppState,
};

fn error_json(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn parse_id(id: &str) -> Result<ObjectId, Response> {
    ObjectId::parse_str(id).map_err(|_| error_json(StatusCode::BAD_REQUEST, "bad id"))
}

#[derive(Deserialize)]
pub struct ListAlertsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

// GET /api/alerts?status=pending&limit=50
pub async fn get_alerts(State(state): State<AppState>, Query(q): Query<ListAlertsQuery>) -> Response {
    let status = match q.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => None,
        Some(raw) => match AlertStatus::parse(raw) {
            Some(s) => Some(s),
            None => return error_json(StatusCode::BAD_REQUEST, format!("unknown status: {raw}")),
        },
    };

    match alerts_service::list_alerts(&state, status, q.limit).await {
        Ok(alerts) => {
            let items: Vec<serde_json::Value> = alerts.iter().map(alerts_service::alert_json).collect();
            (StatusCode::OK, Json(json!({ "alerts": items }))).into_response()
        }
        Err(e) => error_json(StatusCode::INTERNAL_SERVER_ERROR, format!("db error: {e}")),
    }
}

// GET /api/alerts/:id/deliveries
pub async fn get_alert_deliveries(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let oid = match parse_id(&id) {
        Ok(x) => x,
        Err(res) => return res,
    };

    match alerts_service::list_alert_deliveries(&state, oid).await {
        Ok(Some(deliveries)) => {
            let items: Vec<serde_json::Value> =
                deliveries.iter().map(alerts_service::delivery_json).collect();
            (StatusCode::OK, Json(json!({ "deliveries": items }))).into_response()
        }
        Ok(None) => error_json(StatusCode::NOT_FOUND, "alert not found"),
        Err(e) => error_json(StatusCode::INTERNAL_SERVER_ERROR, format!("db error: {e}")),
    }
}

// POST /api/alerts/:id/ack
pub async fn post_ack_alert(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let oid = match parse_id(&id) {
        Ok(x) => x,
        Err(res) => return res,
    };

    match alerts_service::acknowledge_alert(&state, oid).await {
        Ok(Some(alert)) => (StatusCode::OK, Json(alerts_service::alert_json(&alert))).into_response(),
        Ok(None) => error_json(StatusCode::NOT_FOUND, "alert not found"),
        Err(e) => error_json(StatusCode::INTERNAL_SERVER_ERROR, format!("db error: {e}")),
    }
}

// POST /api/scan
pub async fn post_run_scan(State(state): State<AppState>) -> Response {
    match alert_monitor::run_tick(&state).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(EngineError::AlreadyRunning) => {
            error_json(StatusCode::CONFLICT, "an alert scan is already running")
        }
        Err(e) => error_json(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
