use mongodb::bson::oid::ObjectId;
use serde_json::json;

use crate::{
    error::StoreError,
    events,
    models::{Alert, AlertStatus, Delivery},
    AppState,
};

pub const DEFAULT_LIST_LIMIT: i64 = 100;
pub const MAX_LIST_LIMIT: i64 = 500;

pub async fn list_alerts(
    state: &AppState,
    status: Option<AlertStatus>,
    limit: Option<i64>,
) -> Result<Vec<Alert>, StoreError> {
    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
    state.engine.store().list_alerts(status, limit).await
}

/// `None` when the alert does not exist.
pub async fn list_alert_deliveries(
    state: &AppState,
    alert_id: ObjectId,
) -> Result<Option<Vec<Delivery>>, StoreError> {
    let store = state.engine.store();
    if store.get_alert(alert_id).await?.is_none() {
        return Ok(None);
    }
    store.list_deliveries(alert_id).await.map(Some)
}

/// Marks the alert acknowledged and writes the `ack` audit record.
/// `None` when the alert does not exist.
pub async fn acknowledge_alert(state: &AppState, alert_id: ObjectId) -> Result<Option<Alert>, StoreError> {
    let now = state.engine.clock().now().timestamp();
    let acked = state.engine.store().acknowledge(alert_id, now).await?;

    if acked.is_some() {
        let _ = state.events_tx.send(events::ALERTS_UPDATED.to_string());
    }

    Ok(acked)
}

pub fn alert_json(a: &Alert) -> serde_json::Value {
    json!({
        "id": a.id.to_hex(),
        "fingerprint": a.fingerprint,
        "kind": a.kind,
        "severity": a.severity,
        "status": a.status,
        "title": a.title,
        "description": a.description,
        "trigger_at": a.trigger_at,
        "expires_at": a.expires_at,
        "references": a.references,
        "metadata": a.metadata,
        "created_at": a.created_at,
        "updated_at": a.updated_at,
    })
}

pub fn delivery_json(d: &Delivery) -> serde_json::Value {
    json!({
        "id": d.id.to_hex(),
        "alert_id": d.alert_id.to_hex(),
        "channel": d.channel,
        "success": d.success,
        "metadata": d.metadata,
        "created_at": d.created_at,
    })
}
