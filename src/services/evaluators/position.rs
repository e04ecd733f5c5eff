use chrono::{DateTime, Utc};
use serde_json::json;

use super::parse_optional;
use crate::{
    config::AlertConfig,
    error::EvalError,
    models::{
        AlertCandidate, AlertKind, AlertRefs, AlertSeverity, PositionSnapshot, RiskInfo, RiskLevel,
    },
};

/// Leveraged/AMM positions whose health has degraded to warning or worse.
///
/// The precomputed risk descriptor wins when present; otherwise the raw
/// health ratio is compared against the configured thresholds.
pub fn evaluate_position(
    p: &PositionSnapshot,
    config: &AlertConfig,
    _now: DateTime<Utc>,
) -> Result<Option<AlertCandidate>, EvalError> {
    let risk = RiskInfo::from_metadata(p.metadata.as_ref());

    let (level, signals, metrics, ratio) = match &risk {
        RiskInfo::Known {
            level,
            signals,
            metrics,
        } => {
            // descriptor wins; the ratio is informational only
            let ratio = p.health_ratio.as_ref().and_then(|r| r.to_f64());
            (*level, signals.as_slice(), Some(metrics), ratio)
        }
        RiskInfo::Unknown => {
            let Some(r) = parse_optional("health_ratio", p.health_ratio.as_ref())? else {
                return Ok(None);
            };
            (level_from_ratio(r, config), &[] as &[String], None, Some(r))
        }
    };

    let severity = match level {
        RiskLevel::Critical => AlertSeverity::Critical,
        RiskLevel::Warning => AlertSeverity::Warning,
        RiskLevel::Healthy => return Ok(None),
    };

    let description = if !signals.is_empty() {
        signals.join("; ")
    } else if let Some(r) = ratio {
        format!("Health ratio at {r:.3}.")
    } else {
        format!("Risk level reported as {}.", severity.as_str())
    };

    let protocol = p.protocol_name.as_deref().unwrap_or(&p.protocol_id);

    let mut c = AlertCandidate::new(
        AlertKind::PositionHealth,
        &[
            ("wallet_id", p.wallet_id.as_str()),
            ("position_id", p.position_id.as_str()),
        ],
    );
    c.severity = severity;
    c.title = match severity {
        AlertSeverity::Critical => format!("Position on {protocol} near liquidation"),
        _ => format!("Position on {protocol} needs attention"),
    };
    c.description = description;
    c.references = AlertRefs {
        wallet_id: Some(p.wallet_id.clone()),
        protocol_id: Some(p.protocol_id.clone()),
        position_id: Some(p.position_id.clone()),
        ..AlertRefs::default()
    };
    let risk_source = if metrics.is_some() { "metadata" } else { "health_ratio" };
    c.metadata = json!({
        "health_ratio": ratio,
        "risk_source": risk_source,
        "signals": signals,
        "metrics": metrics,
    });

    Ok(Some(c))
}

fn level_from_ratio(ratio: f64, config: &AlertConfig) -> RiskLevel {
    if ratio < config.position_critical_health {
        RiskLevel::Critical
    } else if ratio < config.position_warning_health {
        RiskLevel::Warning
    } else {
        RiskLevel::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DecimalValue;

    fn position(ratio: Option<&str>, metadata: Option<serde_json::Value>) -> PositionSnapshot {
        PositionSnapshot {
            position_id: "pos-9".into(),
            wallet_id: "w-1".into(),
            protocol_id: "morpho".into(),
            protocol_name: None,
            health_ratio: ratio.map(DecimalValue::from),
            metadata,
        }
    }

    fn eval(p: &PositionSnapshot) -> Result<Option<AlertCandidate>, EvalError> {
        evaluate_position(p, &AlertConfig::default(), Utc::now())
    }

    #[test]
    fn ratio_fallback_thresholds() {
        let c = eval(&position(Some("1.03"), None)).unwrap().unwrap();
        assert_eq!(c.severity, AlertSeverity::Critical);
        assert_eq!(c.description, "Health ratio at 1.030.");

        let c = eval(&position(Some("1.1"), None)).unwrap().unwrap();
        assert_eq!(c.severity, AlertSeverity::Warning);

        assert_eq!(eval(&position(Some("1.5"), None)), Ok(None));
        assert_eq!(eval(&position(Some("1.2"), None)), Ok(None));
    }

    #[test]
    fn risk_metadata_takes_precedence() {
        let meta = json!({
            "risk": {
                "level": "critical",
                "signals": ["price outside range", "utilization 98%"],
                "metrics": { "utilization": 0.98 }
            }
        });
        let c = eval(&position(Some("3.0"), Some(meta))).unwrap().unwrap();

        assert_eq!(c.severity, AlertSeverity::Critical);
        assert_eq!(c.description, "price outside range; utilization 98%");
        assert_eq!(c.metadata["risk_source"], "metadata");
    }

    #[test]
    fn healthy_risk_level_emits_nothing() {
        let meta = json!({ "risk": { "level": "healthy" } });
        assert_eq!(eval(&position(Some("1.01"), Some(meta))), Ok(None));
    }

    #[test]
    fn unknown_risk_falls_back_to_ratio() {
        let meta = json!({ "risk": { "level": "unknown", "signals": ["stale"] } });
        let c = eval(&position(Some("1.1"), Some(meta))).unwrap().unwrap();
        assert_eq!(c.severity, AlertSeverity::Warning);
        assert_eq!(c.metadata["risk_source"], "health_ratio");
    }

    #[test]
    fn no_risk_and_no_ratio_is_skipped_quietly() {
        assert_eq!(eval(&position(None, None)), Ok(None));
    }

    #[test]
    fn known_risk_ignores_malformed_ratio() {
        let meta = json!({ "risk": { "level": "critical", "signals": ["oracle lagging"] } });
        let c = eval(&position(Some("n/a"), Some(meta))).unwrap().unwrap();

        assert_eq!(c.severity, AlertSeverity::Critical);
        assert_eq!(c.description, "oracle lagging");
        assert_eq!(c.metadata["health_ratio"], serde_json::Value::Null);
    }

    #[test]
    fn malformed_ratio_is_an_error() {
        assert!(eval(&position(Some("n/a"), None)).is_err());
    }
}
