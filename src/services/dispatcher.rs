//! Sends pending alerts through every configured channel, once per channel.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::{alert_store::AlertStore, clock::Clock};
use crate::{
    channels::{ChannelAdapter, DeliveryOutcome},
    error::StoreError,
    models::{Alert, NewDelivery},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelSummary {
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchSummary {
    pub attempted_alerts: usize,
    pub dispatched: usize,
    pub channels: BTreeMap<String, ChannelSummary>,
}

pub struct DeliveryDispatcher {
    store: Arc<dyn AlertStore>,
    clock: Arc<dyn Clock>,
    channels: Vec<Arc<dyn ChannelAdapter>>,
    batch_limit: i64,
    timeout: Duration,
}

impl DeliveryDispatcher {
    pub fn new(
        store: Arc<dyn AlertStore>,
        clock: Arc<dyn Clock>,
        channels: Vec<Arc<dyn ChannelAdapter>>,
        batch_limit: i64,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            channels,
            batch_limit,
            timeout,
        }
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// One pass over the oldest pending alerts.
    ///
    /// Channel failures are recorded and retried next run. Only store errors
    /// abort the pass.
    pub async fn dispatch(&self) -> Result<DispatchSummary, StoreError> {
        let mut summary = DispatchSummary::default();
        for c in &self.channels {
            summary.channels.entry(c.name().to_string()).or_default();
        }

        if self.channels.is_empty() {
            debug!("no delivery channels, skipping dispatch");
            return Ok(summary);
        }

        let batch = self.store.find_pending(self.batch_limit).await?;
        summary.attempted_alerts = batch.len();

        for alert in &batch {
            if self.dispatch_one(alert, &mut summary).await? {
                summary.dispatched += 1;
            }
        }

        info!(
            alerts = summary.attempted_alerts,
            dispatched = summary.dispatched,
            "dispatch pass finished"
        );
        Ok(summary)
    }

    /// Returns true if the alert was promoted to `dispatched`.
    async fn dispatch_one(&self, alert: &Alert, summary: &mut DispatchSummary) -> Result<bool, StoreError> {
        let mut any_success = false;

        for channel in &self.channels {
            let name = channel.name();
            let stats = summary.channels.entry(name.to_string()).or_default();

            if self.store.has_successful_delivery(alert.id, name).await? {
                // an earlier run already got this one through
                stats.skipped += 1;
                any_success = true;
                continue;
            }

            let outcome = self.attempt(channel.as_ref(), alert).await;
            if outcome.success {
                stats.delivered += 1;
                any_success = true;
            } else {
                stats.failed += 1;
            }

            self.store
                .append_delivery(
                    NewDelivery {
                        alert_id: alert.id,
                        channel: name.to_string(),
                        success: outcome.success,
                        metadata: outcome.metadata.unwrap_or(serde_json::Value::Null),
                    },
                    self.clock.now().timestamp(),
                )
                .await?;
        }

        if !any_success {
            return Ok(false);
        }
        self.store
            .mark_dispatched(alert.id, self.clock.now().timestamp())
            .await
    }

    // Errors and timeouts become failed outcomes; nothing escapes to the caller.
    async fn attempt(&self, channel: &dyn ChannelAdapter, alert: &Alert) -> DeliveryOutcome {
        let name = channel.name();
        match tokio::time::timeout(self.timeout, channel.deliver(alert)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(channel = name, alert = %alert.id.to_hex(), error = %e, "delivery failed");
                DeliveryOutcome::rejected(json!({ "error": e.to_string() }))
            }
            Err(_) => {
                warn!(channel = name, alert = %alert.id.to_hex(), "delivery timed out");
                DeliveryOutcome::rejected(json!({
                    "error": format!("timed out after {}s", self.timeout.as_secs_f64()),
                }))
            }
        }
    }
}
