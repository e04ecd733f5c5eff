//! Turns evaluator candidates into stored alerts and closes the ones whose
//! condition is gone.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::{alert_store::AlertStore, clock::Clock};
use crate::{
    error::StoreError,
    models::{Alert, AlertCandidate, AlertKind, Upserted},
};

/// SHA-256 over the canonical JSON of `{kind, ...identity}`.
///
/// Keys are sorted, so the digest is independent of insertion order.
/// Only identity fields go in; severity, text, and metadata never do.
pub fn fingerprint(kind: AlertKind, identity: &BTreeMap<String, String>) -> String {
    // serde_json::Map may keep insertion order, a BTreeMap always serializes sorted
    let mut canonical: BTreeMap<&str, &str> = identity
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    canonical.insert("kind", kind.as_str());

    let json = serde_json::to_string(&canonical).unwrap_or_default();
    hex::encode(Sha256::digest(json.as_bytes()))
}

/// One instance per run. Collects the run's active set as it upserts.
pub struct AlertReconciler {
    store: Arc<dyn AlertStore>,
    clock: Arc<dyn Clock>,
    active: HashSet<String>,
}

impl AlertReconciler {
    pub fn new(store: Arc<dyn AlertStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            active: HashSet::new(),
        }
    }

    pub async fn upsert(&mut self, candidate: AlertCandidate) -> Result<Upserted, StoreError> {
        let fp = fingerprint(candidate.kind, &candidate.identity);
        let now = self.clock.now().timestamp();

        let res = self
            .store
            .upsert_by_fingerprint(&fp, candidate.into(), now)
            .await?;

        debug!(
            fingerprint = %fp,
            kind = res.alert.kind.as_str(),
            severity = res.alert.severity.as_str(),
            created = res.created,
            "alert upserted"
        );

        self.active.insert(fp);
        Ok(res)
    }

    /// Resolves every open alert not produced this run. Runs even when the
    /// active set is empty.
    pub async fn close_stale(&self) -> Result<Vec<Alert>, StoreError> {
        let stale = self.store.find_open_excluding(&self.active).await?;
        if stale.is_empty() {
            return Ok(stale);
        }

        let ids: Vec<_> = stale.iter().map(|a| a.id).collect();
        let now = self.clock.now().timestamp();
        let changed = self.store.mark_resolved(&ids, now).await?;

        info!(resolved = changed, "closed stale alerts");
        Ok(stale)
    }
}
