use chrono::{DateTime, Utc};
use serde_json::json;

use super::{fmt_ts, hours_until};
use crate::{
    config::AlertConfig,
    error::EvalError,
    models::{AlertCandidate, AlertKind, AlertRefs, AlertSeverity, EpochSnapshot},
};

/// Governance epochs starting within the warning window.
pub fn evaluate_epoch(
    e: &EpochSnapshot,
    config: &AlertConfig,
    now: DateTime<Utc>,
) -> Result<Option<AlertCandidate>, EvalError> {
    let hours = hours_until("starts_at", e.starts_at, now)?;
    if hours < 0.0 || hours > config.governance_warning_hours {
        return Ok(None);
    }

    let severity = if hours <= config.governance_critical_hours {
        AlertSeverity::Critical
    } else {
        AlertSeverity::Warning
    };

    let protocol = e.protocol_name.as_deref().unwrap_or(&e.protocol_id);

    let mut c = AlertCandidate::new(
        AlertKind::GovernanceEpoch,
        &[
            ("protocol_id", e.protocol_id.as_str()),
            ("epoch_id", e.epoch_id.as_str()),
        ],
    );
    c.severity = severity;
    c.title = format!("{protocol} epoch {} starts in {:.0}h", e.epoch_id, hours.ceil());
    c.description = format!(
        "Voting epoch runs {} to {}. Review votes and bribes before it opens.",
        fmt_ts(e.starts_at),
        fmt_ts(e.ends_at)
    );
    c.expires_at = Some(e.starts_at);
    c.references = AlertRefs {
        protocol_id: Some(e.protocol_id.clone()),
        epoch_id: Some(e.epoch_id.clone()),
        ..AlertRefs::default()
    };
    c.metadata = json!({
        "starts_at": e.starts_at,
        "ends_at": e.ends_at,
        "hours_until_start": hours,
    });

    Ok(Some(c))
}
