use std::collections::HashSet;

use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Document};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::{Collection, Cursor, Database};

use super::alert_store::{ack_delivery, AlertStore};
use crate::{
    error::StoreError,
    models::{Alert, AlertFields, AlertStatus, Delivery, NewDelivery, Upserted},
};

pub const ALERTS: &str = "alerts";
pub const DELIVERIES: &str = "deliveries";

#[derive(Clone)]
pub struct MongoAlertStore {
    db: Database,
}

impl MongoAlertStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn alerts(&self) -> Collection<Alert> {
        self.db.collection::<Alert>(ALERTS)
    }

    fn deliveries(&self) -> Collection<Delivery> {
        self.db.collection::<Delivery>(DELIVERIES)
    }
}

fn open_statuses() -> Vec<&'static str> {
    AlertStatus::OPEN.iter().map(|s| s.as_str()).collect()
}

async fn drain<T>(mut cursor: Cursor<T>) -> Result<Vec<T>, StoreError>
where
    T: serde::de::DeserializeOwned + Unpin + Send + Sync,
{
    let mut out: Vec<T> = vec![];
    while let Some(res) = cursor.next().await {
        out.push(res?);
    }
    Ok(out)
}

#[async_trait]
impl AlertStore for MongoAlertStore {
    async fn upsert_by_fingerprint(
        &self,
        fingerprint: &str,
        fields: AlertFields,
        now: i64,
    ) -> Result<Upserted, StoreError> {
        let alerts = self.alerts();

        // find by fingerprint, else insert; the unique index rejects a racing duplicate
        if let Some(mut existing) = alerts.find_one(doc! { "fingerprint": fingerprint }, None).await? {
            let set: Document = doc! {
                "kind": fields.kind.as_str(),
                "severity": fields.severity.as_str(),
                "status": AlertStatus::Pending.as_str(),
                "title": fields.title.as_str(),
                "description": fields.description.as_str(),
                "trigger_at": now,
                "expires_at": fields.expires_at,
                "references": to_bson(&fields.references)?,
                "metadata": to_bson(&fields.metadata)?,
                "updated_at": now,
            };

            alerts
                .update_one(doc! { "_id": existing.id }, doc! { "$set": set }, None)
                .await?;

            existing.kind = fields.kind;
            existing.severity = fields.severity;
            existing.status = AlertStatus::Pending;
            existing.title = fields.title;
            existing.description = fields.description;
            existing.trigger_at = now;
            existing.expires_at = fields.expires_at;
            existing.references = fields.references;
            existing.metadata = fields.metadata;
            existing.updated_at = now;

            return Ok(Upserted {
                alert: existing,
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

        alerts.insert_one(&alert, None).await?;

        Ok(Upserted {
            alert,
            created: true,
        })
    }

    async fn find_open_excluding(&self, keep: &HashSet<String>) -> Result<Vec<Alert>, StoreError> {
        let keep: Vec<String> = keep.iter().cloned().collect();
        let cursor = self
            .alerts()
            .find(
                doc! {
                    "status": { "$in": open_statuses() },
                    "fingerprint": { "$nin": keep },
                },
                None,
            )
            .await?;
        drain(cursor).await
    }

    async fn mark_resolved(&self, ids: &[ObjectId], now: i64) -> Result<u64, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let res = self
            .alerts()
            .update_many(
                doc! { "_id": { "$in": ids.to_vec() }, "status": { "$in": open_statuses() } },
                doc! { "$set": { "status": AlertStatus::Resolved.as_str(), "updated_at": now } },
                None,
            )
            .await?;
        Ok(res.modified_count)
    }

    async fn find_pending(&self, limit: i64) -> Result<Vec<Alert>, StoreError> {
        let find_opts = FindOptions::builder()
            .sort(doc! { "trigger_at": 1, "_id": 1 })
            .limit(limit)
            .build();

        let cursor = self
            .alerts()
            .find(doc! { "status": AlertStatus::Pending.as_str() }, find_opts)
            .await?;
        drain(cursor).await
    }

    async fn mark_dispatched(&self, id: ObjectId, now: i64) -> Result<bool, StoreError> {
        let res = self
            .alerts()
            .update_one(
                doc! { "_id": id, "status": AlertStatus::Pending.as_str() },
                doc! { "$set": { "status": AlertStatus::Dispatched.as_str(), "updated_at": now } },
                None,
            )
            .await?;
        Ok(res.matched_count > 0)
    }

    async fn append_delivery(&self, delivery: NewDelivery, now: i64) -> Result<Delivery, StoreError> {
        let d = delivery.into_delivery(now);
        self.deliveries().insert_one(&d, None).await?;
        Ok(d)
    }

    async fn has_successful_delivery(&self, alert_id: ObjectId, channel: &str) -> Result<bool, StoreError> {
        let found = self
            .deliveries()
            .find_one(
                doc! { "alert_id": alert_id, "channel": channel, "success": true },
                None,
            )
            .await?;
        Ok(found.is_some())
    }

    async fn acknowledge(&self, id: ObjectId, now: i64) -> Result<Option<Alert>, StoreError> {
        let opts = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let updated = self
            .alerts()
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$set": { "status": AlertStatus::Acknowledged.as_str(), "updated_at": now } },
                opts,
            )
            .await?;

        let Some(alert) = updated else {
            return Ok(None);
        };

        self.append_delivery(ack_delivery(id, now), now).await?;
        Ok(Some(alert))
    }

    async fn get_alert(&self, id: ObjectId) -> Result<Option<Alert>, StoreError> {
        Ok(self.alerts().find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_alerts(&self, status: Option<AlertStatus>, limit: i64) -> Result<Vec<Alert>, StoreError> {
        let filter = match status {
            Some(s) => doc! { "status": s.as_str() },
            None => doc! {},
        };
        let find_opts = FindOptions::builder()
            .sort(doc! { "trigger_at": -1 })
            .limit(limit)
            .build();

        let cursor = self.alerts().find(filter, find_opts).await?;
        drain(cursor).await
    }

    async fn list_deliveries(&self, alert_id: ObjectId) -> Result<Vec<Delivery>, StoreError> {
        let find_opts = FindOptions::builder()
            .sort(doc! { "created_at": 1, "_id": 1 })
            .build();

        let cursor = self
            .deliveries()
            .find(doc! { "alert_id": alert_id }, find_opts)
            .await?;
        drain(cursor).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }
}
