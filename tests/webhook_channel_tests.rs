use std::sync::{Arc, Mutex};

use axum::{
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use mongodb::bson::oid::ObjectId;
use serde_json::json;

use defiwatch::{
    channels::{ChannelAdapter, WebhookChannel},
    error::ChannelError,
    models::{Alert, AlertKind, AlertRefs, AlertSeverity, AlertStatus},
};

#[derive(Clone, Default)]
struct Received {
    payloads: Arc<Mutex<Vec<serde_json::Value>>>,
    auth: Arc<Mutex<Vec<Option<String>>>>,
}

fn sample_alert() -> Alert {
    Alert {
        id: ObjectId::new(),
        fingerprint: "ab".repeat(32),
        kind: AlertKind::PositionHealth,
        severity: AlertSeverity::Critical,
        status: AlertStatus::Pending,
        title: "Aave position health".to_string(),
        description: "Health ratio at 1.010.".to_string(),
        trigger_at: 1_775_034_000,
        expires_at: None,
        references: AlertRefs {
            wallet_id: Some("wallet-1".to_string()),
            position_id: Some("pos-1".to_string()),
            ..AlertRefs::default()
        },
        metadata: json!({ "health_ratio": 1.01 }),
        created_at: 1_775_034_000,
        updated_at: 1_775_034_000,
    }
}

/// Starts a local receiver that answers every POST with `status` and `body`.
async fn spawn_receiver(status: StatusCode, body: &'static str) -> (String, Received) {
    let received = Received::default();
    let sink = received.clone();

    let app = Router::new().route(
        "/hook",
        post(move |headers: HeaderMap, Json(payload): Json<serde_json::Value>| {
            let sink = sink.clone();
            async move {
                sink.payloads.lock().unwrap().push(payload);
                sink.auth.lock().unwrap().push(
                    headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string),
                );
                (status, body)
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/hook"), received)
}

#[tokio::test]
async fn accepted_post_is_a_success() {
    let (url, received) = spawn_receiver(StatusCode::OK, "ok").await;
    let channel = WebhookChannel::new(url, Some("s3cret".to_string()));
    let alert = sample_alert();

    let outcome = channel.deliver(&alert).await.unwrap();

    assert!(outcome.success);
    let meta = outcome.metadata.unwrap();
    assert_eq!(meta["status"], 200);
    assert_eq!(meta["body"], "ok");

    let payloads = received.payloads.lock().unwrap();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0]["id"], alert.id.to_hex());
    assert_eq!(payloads[0]["kind"], "position_health");
    assert_eq!(payloads[0]["severity"], "critical");
    assert_eq!(payloads[0]["references"]["position_id"], "pos-1");
    assert!(payloads[0].get("expires_at").is_none());

    let auth = received.auth.lock().unwrap();
    assert_eq!(auth[0].as_deref(), Some("Bearer s3cret"));
}

#[tokio::test]
async fn no_token_sends_no_auth_header() {
    let (url, received) = spawn_receiver(StatusCode::NO_CONTENT, "").await;
    let channel = WebhookChannel::new(url, None);

    let outcome = channel.deliver(&sample_alert()).await.unwrap();

    assert!(outcome.success);
    assert_eq!(received.auth.lock().unwrap()[0], None);
}

#[tokio::test]
async fn rejected_post_is_a_failed_outcome() {
    let (url, _) = spawn_receiver(StatusCode::INTERNAL_SERVER_ERROR, "boom").await;
    let channel = WebhookChannel::new(url, None);

    let outcome = channel.deliver(&sample_alert()).await.unwrap();

    assert!(!outcome.success);
    let meta = outcome.metadata.unwrap();
    assert_eq!(meta["status"], 500);
    assert_eq!(meta["body"], "boom");
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    // bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let channel = WebhookChannel::new(format!("http://{addr}/hook"), None);
    let err = channel.deliver(&sample_alert()).await.unwrap_err();

    assert!(matches!(err, ChannelError::Http(_)));
}
