use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use mongodb::bson::oid::ObjectId;
use tower::ServiceExt;

use defiwatch::{
    config::{self, AlertConfig},
    events,
    models::{DecimalValue, RewardSnapshot},
    routes,
    services::{
        alert_engine::AlertEngine, clock::FixedClock, memory_store::MemoryAlertStore,
        snapshot_source::StaticSnapshots,
    },
    AppState,
};

fn test_state() -> AppState {
    let settings = config::Settings::from_lookup(|_| None);
    let now = Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap();

    let snapshots = StaticSnapshots {
        rewards: Some(vec![RewardSnapshot {
            opportunity_id: "opp-1".to_string(),
            wallet_id: "wallet-1".to_string(),
            protocol_id: "aave".to_string(),
            token_id: "op".to_string(),
            protocol_name: None,
            token_symbol: None,
            amount: DecimalValue::from("3"),
            usd_value: Some(DecimalValue::from("80")),
            gas_estimate_usd: None,
            claim_deadline: None,
        }]),
        ..StaticSnapshots::empty()
    };

    let engine = AlertEngine::new(
        Arc::new(MemoryAlertStore::new()),
        Arc::new(snapshots),
        vec![],
        Arc::new(FixedClock::new(now)),
        AlertConfig::default(),
        Duration::from_secs(1),
    );

    AppState {
        settings,
        engine: Arc::new(engine),
        events_tx: events::channel(),
    }
}

async fn send(state: &AppState, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
    let app = routes::app(state.clone());
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn seeded_alert_id(state: &AppState) -> String {
    let (status, body) = send(state, "POST", "/api/scan").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["domains"][0]["created"], 1);

    let (_, body) = send(state, "GET", "/api/alerts").await;
    body["alerts"][0]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn scan_returns_run_summary() {
    let state = test_state();
    let (status, body) = send(&state, "POST", "/api/scan").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["domains"].as_array().unwrap().len(), 3);
    assert_eq!(body["domains"][0]["domain"], "reward_claim");
    assert_eq!(body["resolved"], 0);
}

#[tokio::test]
async fn list_alerts_with_status_filter() {
    let state = test_state();
    seeded_alert_id(&state).await;

    let (status, body) = send(&state, "GET", "/api/alerts?status=pending").await;
    assert_eq!(status, StatusCode::OK);
    let alerts = body["alerts"].as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["kind"], "reward_claim");
    assert_eq!(alerts[0]["severity"], "info");

    let (_, body) = send(&state, "GET", "/api/alerts?status=resolved").await;
    assert!(body["alerts"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn list_alerts_rejects_unknown_status() {
    let state = test_state();
    let (status, body) = send(&state, "GET", "/api/alerts?status=snoozed").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("snoozed"));
}

#[tokio::test]
async fn ack_marks_alert_and_writes_audit_record() {
    let state = test_state();
    let id = seeded_alert_id(&state).await;
    let mut rx = state.events_tx.subscribe();

    let (status, body) = send(&state, "POST", &format!("/api/alerts/{id}/ack")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "acknowledged");
    assert_eq!(rx.try_recv().unwrap(), events::ALERTS_UPDATED);

    let (status, body) = send(&state, "GET", &format!("/api/alerts/{id}/deliveries")).await;
    assert_eq!(status, StatusCode::OK);
    let deliveries = body["deliveries"].as_array().unwrap();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0]["channel"], "ack");
    assert_eq!(deliveries[0]["success"], true);
}

#[tokio::test]
async fn ack_bad_or_unknown_id() {
    let state = test_state();

    let (status, _) = send(&state, "POST", "/api/alerts/not-an-id/ack").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = ObjectId::new().to_hex();
    let (status, _) = send(&state, "POST", &format!("/api/alerts/{missing}/ack")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&state, "GET", &format!("/api/alerts/{missing}/deliveries")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_endpoints() {
    let state = test_state();

    let (status, body) = send(&state, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&state, "GET", "/health/db").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"], "ok");

    let (status, _) = send(&state, "GET", "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
