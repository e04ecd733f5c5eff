//! Persistence contract for alerts and their delivery audit trail.

use std::collections::HashSet;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::{
    error::StoreError,
    models::{Alert, AlertFields, AlertStatus, Delivery, NewDelivery, Upserted},
};

/// Alert persistence. `fingerprint` is unique across all alerts.
///
/// Deliveries are append-only: there is no update or delete for them.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Find by fingerprint and overwrite the mutable fields, else create.
    /// Either way the alert ends up `pending` with `trigger_at = now`.
    async fn upsert_by_fingerprint(
        &self,
        fingerprint: &str,
        fields: AlertFields,
        now: i64,
    ) -> Result<Upserted, StoreError>;

    /// Open (`pending`/`dispatched`) alerts whose fingerprint is not in `keep`.
    async fn find_open_excluding(&self, keep: &HashSet<String>) -> Result<Vec<Alert>, StoreError>;

    /// Resolves the given alerts if they are still open. Returns how many changed.
    async fn mark_resolved(&self, ids: &[ObjectId], now: i64) -> Result<u64, StoreError>;

    /// Oldest-trigger-first batch of `pending` alerts.
    async fn find_pending(&self, limit: i64) -> Result<Vec<Alert>, StoreError>;

    /// `pending` -> `dispatched`. Returns false if the alert was no longer pending.
    async fn mark_dispatched(&self, id: ObjectId, now: i64) -> Result<bool, StoreError>;

    async fn append_delivery(&self, delivery: NewDelivery, now: i64) -> Result<Delivery, StoreError>;

    async fn has_successful_delivery(&self, alert_id: ObjectId, channel: &str) -> Result<bool, StoreError>;

    /// Sets `acknowledged` and appends a synthetic delivery on the `ack` channel.
    /// `None` when no alert has this id.
    async fn acknowledge(&self, id: ObjectId, now: i64) -> Result<Option<Alert>, StoreError>;

    async fn get_alert(&self, id: ObjectId) -> Result<Option<Alert>, StoreError>;

    /// Newest trigger first.
    async fn list_alerts(&self, status: Option<AlertStatus>, limit: i64) -> Result<Vec<Alert>, StoreError>;

    /// Oldest first.
    async fn list_deliveries(&self, alert_id: ObjectId) -> Result<Vec<Delivery>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

pub(crate) fn ack_delivery(alert_id: ObjectId, now: i64) -> NewDelivery {
    NewDelivery {
        alert_id,
        channel: crate::models::ACK_CHANNEL.to_string(),
        success: true,
        metadata: serde_json::json!({ "acknowledged_at": now }),
    }
}
