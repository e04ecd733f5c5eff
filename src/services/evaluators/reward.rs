use chrono::{DateTime, Utc};
use serde_json::json;

use super::{fmt_ts, hours_until, parse_decimal, parse_optional};
use crate::{
    config::AlertConfig,
    error::EvalError,
    models::{AlertCandidate, AlertKind, AlertRefs, AlertSeverity, RewardSnapshot},
};

/// Claimable rewards worth more than the net threshold after gas.
pub fn evaluate_reward(
    r: &RewardSnapshot,
    config: &AlertConfig,
    now: DateTime<Utc>,
) -> Result<Option<AlertCandidate>, EvalError> {
    parse_decimal("amount", &r.amount)?;
    let usd = parse_optional("usd_value", r.usd_value.as_ref())?;
    let gas = parse_optional("gas_estimate_usd", r.gas_estimate_usd.as_ref())?;

    let Some(usd) = usd else {
        return Ok(None);
    };
    let net = match gas {
        Some(g) => usd - g,
        None => usd,
    };
    if net <= config.reward_net_threshold {
        return Ok(None);
    }

    let hours_left = r
        .claim_deadline
        .map(|d| hours_until("claim_deadline", d, now))
        .transpose()?;
    let severity = match hours_left {
        Some(h) if h <= config.reward_critical_hours => AlertSeverity::Critical,
        Some(h) if h <= config.reward_warning_hours => AlertSeverity::Warning,
        _ => AlertSeverity::Info,
    };

    let protocol = r.protocol_name.as_deref().unwrap_or(&r.protocol_id);
    let token = r.token_symbol.as_deref().unwrap_or(&r.token_id);

    let mut description = match gas {
        Some(g) => format!("Net ${net:.2} claimable after ${g:.2} estimated gas."),
        None => format!("About ${net:.2} claimable."),
    };
    if let Some(deadline) = r.claim_deadline {
        description.push_str(&format!(" Claim before {}.", fmt_ts(deadline)));
    }

    let mut c = AlertCandidate::new(
        AlertKind::RewardClaim,
        &[
            ("wallet_id", r.wallet_id.as_str()),
            ("opportunity_id", r.opportunity_id.as_str()),
        ],
    );
    c.severity = severity;
    c.title = format!("Claim {} {token} on {protocol}", r.amount.raw());
    c.description = description;
    c.expires_at = r.claim_deadline;
    c.references = AlertRefs {
        wallet_id: Some(r.wallet_id.clone()),
        protocol_id: Some(r.protocol_id.clone()),
        token_id: Some(r.token_id.clone()),
        opportunity_id: Some(r.opportunity_id.clone()),
        ..AlertRefs::default()
    };
    c.metadata = json!({
        "amount": r.amount.raw(),
        "usd_value": usd,
        "gas_estimate_usd": gas,
        "net_usd": net,
        "hours_until_deadline": hours_left,
    });

    Ok(Some(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn reward(usd: Option<&str>, gas: Option<&str>, deadline_in: Option<Duration>) -> RewardSnapshot {
        RewardSnapshot {
            opportunity_id: "opp-1".into(),
            wallet_id: "w-1".into(),
            protocol_id: "aave".into(),
            token_id: "tok-op".into(),
            protocol_name: Some("Aave".into()),
            token_symbol: Some("OP".into()),
            amount: "42".into(),
            usd_value: usd.map(Into::into),
            gas_estimate_usd: gas.map(Into::into),
            claim_deadline: deadline_in.map(|d| (now() + d).timestamp()),
        }
    }

    #[test]
    fn deadline_inside_critical_window() {
        let r = reward(Some("50"), Some("5"), Some(Duration::hours(10)));
        let c = evaluate_reward(&r, &AlertConfig::default(), now()).unwrap().unwrap();

        assert_eq!(c.severity, AlertSeverity::Critical);
        assert_eq!(c.kind, AlertKind::RewardClaim);
        assert_eq!(c.metadata["net_usd"], 45.0);
        assert_eq!(c.expires_at, r.claim_deadline);
        assert_eq!(c.title, "Claim 42 OP on Aave");
    }

    #[test]
    fn net_below_threshold_emits_nothing() {
        let r = reward(Some("12"), Some("5"), None);
        assert_eq!(evaluate_reward(&r, &AlertConfig::default(), now()), Ok(None));

        let exact = reward(Some("15"), Some("5"), None);
        assert_eq!(evaluate_reward(&exact, &AlertConfig::default(), now()), Ok(None));
    }

    #[test]
    fn severity_by_deadline_distance() {
        let cfg = AlertConfig::default();
        let sev = |d: Option<Duration>| {
            evaluate_reward(&reward(Some("100"), None, d), &cfg, now())
                .unwrap()
                .unwrap()
                .severity
        };

        assert_eq!(sev(Some(Duration::hours(12))), AlertSeverity::Critical);
        assert_eq!(sev(Some(Duration::hours(13))), AlertSeverity::Warning);
        assert_eq!(sev(Some(Duration::hours(24))), AlertSeverity::Warning);
        assert_eq!(sev(Some(Duration::hours(30))), AlertSeverity::Info);
        assert_eq!(sev(None), AlertSeverity::Info);
    }

    #[test]
    fn missing_usd_is_not_an_error() {
        let r = reward(None, Some("1"), None);
        assert_eq!(evaluate_reward(&r, &AlertConfig::default(), now()), Ok(None));
    }

    #[test]
    fn malformed_decimal_is_an_error() {
        let r = reward(Some("fifty"), None, None);
        let err = evaluate_reward(&r, &AlertConfig::default(), now()).unwrap_err();
        assert_eq!(
            err,
            EvalError::Malformed {
                field: "usd_value",
                value: "fifty".into()
            }
        );
    }

    #[test]
    fn identity_ignores_amounts() {
        let a = evaluate_reward(&reward(Some("50"), None, None), &AlertConfig::default(), now())
            .unwrap()
            .unwrap();
        let b = evaluate_reward(&reward(Some("900"), None, None), &AlertConfig::default(), now())
            .unwrap()
            .unwrap();
        assert_eq!(a.identity, b.identity);
    }
}
