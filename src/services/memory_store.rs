//! In-memory alert store with the same semantics as the MongoDB one.
//! Used by tests and dry runs.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use super::alert_store::{ack_delivery, AlertStore};
use crate::{
    error::StoreError,
    models::{Alert, AlertFields, AlertStatus, Delivery, NewDelivery, Upserted},
};

#[derive(Default)]
struct Inner {
    alerts: Vec<Alert>,
    deliveries: Vec<Delivery>,
}

#[derive(Default)]
pub struct MemoryAlertStore {
    inner: Mutex<Inner>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Total number of alert rows, regardless of status.
    pub fn alert_count(&self) -> usize {
        self.lock().map(|g| g.alerts.len()).unwrap_or(0)
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn upsert_by_fingerprint(
        &self,
        fingerprint: &str,
        fields: AlertFields,
        now: i64,
    ) -> Result<Upserted, StoreError> {
        let mut g = self.lock()?;

        if let Some(existing) = g.alerts.iter_mut().find(|a| a.fingerprint == fingerprint) {
            existing.kind = fields.kind;
            existing.severity = fields.severity;
            existing.title = fields.title;
            existing.description = fields.description;
            existing.expires_at = fields.expires_at;
            existing.references = fields.references;
            existing.metadata = fields.metadata;
            existing.status = AlertStatus::Pending;
            existing.trigger_at = now;
            existing.updated_at = now;

            return Ok(Upserted {
                alert: existing.clone(),
                created: false,
            });
        }

        let alert = Alert {
            id: ObjectId::new(),
            fingerprint: fingerprint.to_string(),
            kind: fields.kind,
            severity: fields.severity,
            status: AlertStatus::Pending,
            title: fields.title,
            description: fields.description,
            trigger_at: now,
            expires_at: fields.expires_at,
            references: fields.references,
            metadata: fields.metadata,
            created_at: now,
            updated_at: now,
        };
        g.alerts.push(alert.clone());

        Ok(Upserted {
            alert,
            created: true,
        })
    }

    async fn find_open_excluding(&self, keep: &HashSet<String>) -> Result<Vec<Alert>, StoreError> {
        let g = self.lock()?;
        Ok(g.alerts
            .iter()
            .filter(|a| a.status.is_open() && !keep.contains(&a.fingerprint))
            .cloned()
            .collect())
    }

    async fn mark_resolved(&self, ids: &[ObjectId], now: i64) -> Result<u64, StoreError> {
        let mut g = self.lock()?;
        let mut changed = 0;
        for a in g.alerts.iter_mut() {
            if a.status.is_open() && ids.contains(&a.id) {
                a.status = AlertStatus::Resolved;
                a.updated_at = now;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn find_pending(&self, limit: i64) -> Result<Vec<Alert>, StoreError> {
        let g = self.lock()?;
        let mut pending: Vec<Alert> = g
            .alerts
            .iter()
            .filter(|a| a.status == AlertStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|a| a.trigger_at);
        pending.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(pending)
    }

    async fn mark_dispatched(&self, id: ObjectId, now: i64) -> Result<bool, StoreError> {
        let mut g = self.lock()?;
        match g
            .alerts
            .iter_mut()
            .find(|a| a.id == id && a.status == AlertStatus::Pending)
        {
            Some(a) => {
                a.status = AlertStatus::Dispatched;
                a.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn append_delivery(&self, delivery: NewDelivery, now: i64) -> Result<Delivery, StoreError> {
        let mut g = self.lock()?;
        let d = delivery.into_delivery(now);
        g.deliveries.push(d.clone());
        Ok(d)
    }

    async fn has_successful_delivery(&self, alert_id: ObjectId, channel: &str) -> Result<bool, StoreError> {
        let g = self.lock()?;
        Ok(g
            .deliveries
            .iter()
            .any(|d| d.alert_id == alert_id && d.channel == channel && d.success))
    }

    async fn acknowledge(&self, id: ObjectId, now: i64) -> Result<Option<Alert>, StoreError> {
        let mut g = self.lock()?;
        let Some(a) = g.alerts.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        a.status = AlertStatus::Acknowledged;
        a.updated_at = now;
        let alert = a.clone();

        g.deliveries.push(ack_delivery(id, now).into_delivery(now));
        Ok(Some(alert))
    }

    async fn get_alert(&self, id: ObjectId) -> Result<Option<Alert>, StoreError> {
        let g = self.lock()?;
        Ok(g.alerts.iter().find(|a| a.id == id).cloned())
    }

    async fn list_alerts(&self, status: Option<AlertStatus>, limit: i64) -> Result<Vec<Alert>, StoreError> {
        let g = self.lock()?;
        let mut items: Vec<Alert> = g
            .alerts
            .iter()
            .filter(|a| status.is_none_or(|s| a.status == s))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.trigger_at.cmp(&a.trigger_at));
        items.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(items)
    }

    async fn list_deliveries(&self, alert_id: ObjectId) -> Result<Vec<Delivery>, StoreError> {
        let g = self.lock()?;
        Ok(g
            .deliveries
            .iter()
            .filter(|d| d.alert_id == alert_id)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}
