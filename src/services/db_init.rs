use mongodb::{
    bson::doc,
    options::IndexOptions,
    Database, IndexModel,
};
use tracing::warn;

use super::{mongo_store, snapshot_source};
use crate::error::StoreError;

pub async fn ensure_indexes(db: &Database) -> Result<(), StoreError> {
    // alerts: one row per condition
    {
        let col = db.collection::<mongodb::bson::Document>(mongo_store::ALERTS);
        let model = IndexModel::builder()
            .keys(doc! { "fingerprint": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None).await?;
    }

    // alerts: dispatch batch (pending, oldest trigger first) and stale scan
    {
        let col = db.collection::<mongodb::bson::Document>(mongo_store::ALERTS);
        let model = IndexModel::builder()
            .keys(doc! { "status": 1, "trigger_at": 1 })
            .build();

        col.create_index(model, None).await?;
    }

    // deliveries: per-channel success lookup
    {
        let col = db.collection::<mongodb::bson::Document>(mongo_store::DELIVERIES);
        let model = IndexModel::builder()
            .keys(doc! { "alert_id": 1, "channel": 1, "success": 1 })
            .build();

        col.create_index(model, None).await?;
    }

    // epochs: window query by start time
    {
        let col = db.collection::<mongodb::bson::Document>(snapshot_source::GOVERNANCE_EPOCHS);
        let model = IndexModel::builder()
            .keys(doc! { "starts_at": 1 })
            .build();

        // snapshot collection is owned by the sync jobs; a failure here is not fatal
        if let Err(e) = col.create_index(model, None).await {
            warn!(collection = snapshot_source::GOVERNANCE_EPOCHS, error = %e, "failed to create epochs index");
        }
    }

    Ok(())
}
