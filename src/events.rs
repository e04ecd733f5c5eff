use tokio::sync::broadcast;

/// Broadcast after a scan or acknowledgement changed alert state.
pub const ALERTS_UPDATED: &str = "alertsUpdated";

pub fn channel() -> broadcast::Sender<String> {
    let (tx, _rx) = broadcast::channel::<String>(64);
    tx
}
