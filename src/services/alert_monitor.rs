use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use super::alert_engine::RunSummary;
use crate::{error::EngineError, events, AppState};

/// Runs the alert scan every `scan_interval_secs`. Returns `None` when the
/// interval is 0 (scanner disabled).
pub fn spawn_alert_scanner(state: AppState) -> Option<JoinHandle<()>> {
    let secs = state.settings.scan_interval_secs;
    if secs == 0 {
        info!("alert scanner disabled (SCAN_INTERVAL_SECS=0)");
        return None;
    }

    info!(interval_secs = secs, "alert scanner started");

    Some(tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(secs));
        // a slow scan must not trigger a burst of catch-up scans
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            match run_tick(&state).await {
                Ok(_) => {}
                Err(EngineError::AlreadyRunning) => {
                    debug!("previous alert scan still running, skipping tick");
                }
                Err(e) => error!(error = %e, "alert scan failed"),
            }
        }
    }))
}

/// One scan, then a UI refresh event if anything changed.
pub async fn run_tick(state: &AppState) -> Result<RunSummary, EngineError> {
    let summary = state.engine.run().await?;

    if summary.changed_anything() {
        let _ = state.events_tx.send(events::ALERTS_UPDATED.to_string());
    }

    Ok(summary)
}
