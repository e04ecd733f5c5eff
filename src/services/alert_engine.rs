//! One alert scan: evaluate every domain, dispatch, then close stale alerts.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{
    alert_store::AlertStore,
    clock::Clock,
    dispatcher::{DeliveryDispatcher, DispatchSummary},
    evaluators::{evaluate_epoch, evaluate_position, evaluate_reward},
    reconciler::AlertReconciler,
    snapshot_source::SnapshotSource,
};
use crate::{
    channels::ChannelAdapter,
    config::AlertConfig,
    error::{EngineError, EvalError, SourceError, StoreError},
    models::{AlertCandidate, AlertKind},
};

#[derive(Debug, Clone, Serialize)]
pub struct DomainSummary {
    pub domain: AlertKind,
    pub evaluated: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    // set when the snapshot source could not be read at all
    pub error: Option<String>,
}

impl DomainSummary {
    fn new(domain: AlertKind) -> Self {
        Self {
            domain,
            evaluated: 0,
            created: 0,
            updated: 0,
            skipped: 0,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: i64,
    pub domains: Vec<DomainSummary>,
    pub dispatch: DispatchSummary,
    pub resolved: usize,
}

impl RunSummary {
    /// True if the run wrote anything a viewer would notice.
    pub fn changed_anything(&self) -> bool {
        self.resolved > 0
            || self.dispatch.dispatched > 0
            || self.domains.iter().any(|d| d.created + d.updated > 0)
    }
}

pub struct AlertEngine {
    store: Arc<dyn AlertStore>,
    source: Arc<dyn SnapshotSource>,
    clock: Arc<dyn Clock>,
    config: AlertConfig,
    dispatcher: DeliveryDispatcher,
    // one scan at a time inside this process
    run_lock: Mutex<()>,
}

impl AlertEngine {
    pub fn new(
        store: Arc<dyn AlertStore>,
        source: Arc<dyn SnapshotSource>,
        channels: Vec<Arc<dyn ChannelAdapter>>,
        clock: Arc<dyn Clock>,
        config: AlertConfig,
        delivery_timeout: Duration,
    ) -> Self {
        let dispatcher = DeliveryDispatcher::new(
            store.clone(),
            clock.clone(),
            channels,
            config.dispatch_batch_limit,
            delivery_timeout,
        );

        Self {
            store,
            source,
            clock,
            config,
            dispatcher,
            run_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn AlertStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.dispatcher.channel_names()
    }

    /// Evaluate (reward, position, governance) -> dispatch -> close stale.
    ///
    /// Dispatch runs before stale-closing so a condition that vanished this
    /// run still gets its final delivery attempt. A domain whose source is
    /// down is reported and skipped; store errors abort the run.
    pub async fn run(&self) -> Result<RunSummary, EngineError> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            return Err(EngineError::AlreadyRunning);
        };

        let now = self.clock.now();
        let mut reconciler = AlertReconciler::new(self.store.clone(), self.clock.clone());
        let mut domains = Vec::with_capacity(3);

        let rewards = self.source.rewards().await;
        domains.push(
            self.evaluate_domain(AlertKind::RewardClaim, rewards, &mut reconciler, |r| {
                evaluate_reward(r, &self.config, now)
            })
            .await?,
        );

        let positions = self.source.positions().await;
        domains.push(
            self.evaluate_domain(AlertKind::PositionHealth, positions, &mut reconciler, |p| {
                evaluate_position(p, &self.config, now)
            })
            .await?,
        );

        let until = governance_window_end(now, self.config.governance_warning_hours);
        let epochs = self
            .source
            .upcoming_epochs(now.timestamp(), until.timestamp())
            .await;
        domains.push(
            self.evaluate_domain(AlertKind::GovernanceEpoch, epochs, &mut reconciler, |e| {
                evaluate_epoch(e, &self.config, now)
            })
            .await?,
        );

        let dispatch = self.dispatcher.dispatch().await?;
        let resolved = reconciler.close_stale().await?.len();

        let summary = RunSummary {
            started_at: now.timestamp(),
            domains,
            dispatch,
            resolved,
        };
        log_summary(&summary, now);
        Ok(summary)
    }

    async fn evaluate_domain<T, F>(
        &self,
        domain: AlertKind,
        items: Result<Vec<T>, SourceError>,
        reconciler: &mut AlertReconciler,
        evaluate: F,
    ) -> Result<DomainSummary, StoreError>
    where
        T: Send + Sync,
        F: Fn(&T) -> Result<Option<AlertCandidate>, EvalError> + Send + Sync,
    {
        let mut summary = DomainSummary::new(domain);

        let items = match items {
            Ok(items) => items,
            Err(e) => {
                warn!(domain = domain.as_str(), error = %e, "snapshot source failed, skipping domain");
                summary.error = Some(e.to_string());
                return Ok(summary);
            }
        };

        for item in &items {
            summary.evaluated += 1;
            let candidate = match evaluate(item) {
                Ok(Some(c)) => c,
                Ok(None) => continue,
                Err(e) => {
                    warn!(domain = domain.as_str(), error = %e, "skipping malformed snapshot");
                    summary.skipped += 1;
                    continue;
                }
            };

            if reconciler.upsert(candidate).await?.created {
                summary.created += 1;
            } else {
                summary.updated += 1;
            }
        }

        Ok(summary)
    }
}

// Saturates at the latest representable time instead of overflowing.
fn governance_window_end(now: DateTime<Utc>, warning_hours: f64) -> DateTime<Utc> {
    TimeDelta::try_seconds((warning_hours * 3600.0) as i64)
        .and_then(|window| now.checked_add_signed(window))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn log_summary(summary: &RunSummary, now: DateTime<Utc>) {
    for d in &summary.domains {
        info!(
            domain = d.domain.as_str(),
            evaluated = d.evaluated,
            created = d.created,
            updated = d.updated,
            skipped = d.skipped,
            error = ?d.error,
            "domain evaluated"
        );
    }
    for (channel, c) in &summary.dispatch.channels {
        info!(
            channel = %channel,
            delivered = c.delivered,
            skipped = c.skipped,
            failed = c.failed,
            "channel deliveries"
        );
    }
    info!(
        at = %now.to_rfc3339(),
        dispatched = summary.dispatch.dispatched,
        resolved = summary.resolved,
        "alert scan finished"
    );
}
