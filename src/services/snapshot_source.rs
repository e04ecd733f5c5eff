//! Read-only access to the domain snapshots the sync jobs maintain.

use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::bson::{doc, from_document, Document};
use mongodb::Database;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::{
    error::SourceError,
    models::{EpochSnapshot, PositionSnapshot, RewardSnapshot},
};

pub const REWARD_OPPORTUNITIES: &str = "reward_opportunities";
pub const POSITIONS: &str = "positions";
pub const GOVERNANCE_EPOCHS: &str = "governance_epochs";

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn rewards(&self) -> Result<Vec<RewardSnapshot>, SourceError>;

    async fn positions(&self) -> Result<Vec<PositionSnapshot>, SourceError>;

    /// Epochs whose start lies in `[from, until]` (unix seconds).
    async fn upcoming_epochs(&self, from: i64, until: i64) -> Result<Vec<EpochSnapshot>, SourceError>;
}

pub struct MongoSnapshotSource {
    db: Database,
}

impl MongoSnapshotSource {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // Documents that don't deserialize are data errors: skip them, keep the rest.
    async fn read<T: DeserializeOwned + Send>(&self, collection: &str, filter: Document) -> Result<Vec<T>, SourceError> {
        let col = self.db.collection::<Document>(collection);
        let mut cursor = col.find(filter, None).await?;

        let mut out: Vec<T> = vec![];
        while let Some(res) = cursor.next().await {
            let raw = res?;
            match from_document::<T>(raw) {
                Ok(item) => out.push(item),
                Err(e) => warn!(collection, error = %e, "skipping malformed snapshot document"),
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl SnapshotSource for MongoSnapshotSource {
    async fn rewards(&self) -> Result<Vec<RewardSnapshot>, SourceError> {
        self.read(REWARD_OPPORTUNITIES, doc! {}).await
    }

    async fn positions(&self) -> Result<Vec<PositionSnapshot>, SourceError> {
        self.read(POSITIONS, doc! {}).await
    }

    async fn upcoming_epochs(&self, from: i64, until: i64) -> Result<Vec<EpochSnapshot>, SourceError> {
        self.read(
            GOVERNANCE_EPOCHS,
            doc! { "starts_at": { "$gte": from, "$lte": until } },
        )
        .await
    }
}

/// Fixed snapshots. A domain set to `None` reports itself as unavailable.
#[derive(Debug, Clone, Default)]
pub struct StaticSnapshots {
    pub rewards: Option<Vec<RewardSnapshot>>,
    pub positions: Option<Vec<PositionSnapshot>>,
    pub epochs: Option<Vec<EpochSnapshot>>,
}

impl StaticSnapshots {
    /// All three domains reachable and empty.
    pub fn empty() -> Self {
        Self {
            rewards: Some(vec![]),
            positions: Some(vec![]),
            epochs: Some(vec![]),
        }
    }
}

fn unavailable<T: Clone>(domain: &str, items: &Option<Vec<T>>) -> Result<Vec<T>, SourceError> {
    items
        .clone()
        .ok_or_else(|| SourceError::Unavailable(format!("{domain} snapshots not loaded")))
}

#[async_trait]
impl SnapshotSource for StaticSnapshots {
    async fn rewards(&self) -> Result<Vec<RewardSnapshot>, SourceError> {
        unavailable("reward", &self.rewards)
    }

    async fn positions(&self) -> Result<Vec<PositionSnapshot>, SourceError> {
        unavailable("position", &self.positions)
    }

    async fn upcoming_epochs(&self, from: i64, until: i64) -> Result<Vec<EpochSnapshot>, SourceError> {
        Ok(unavailable("epoch", &self.epochs)?
            .into_iter()
            .filter(|e| e.starts_at >= from && e.starts_at <= until)
            .collect())
    }
}
