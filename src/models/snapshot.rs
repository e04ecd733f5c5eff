//! Read-only domain snapshots the evaluators consume.
//!
//! These are filled by the sync jobs outside this crate. Numeric fields are
//! kept as they arrive (decimal strings or plain numbers) and only parsed at
//! evaluation time, so one malformed record can be skipped on its own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A decimal as stored upstream: either a JSON/BSON number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecimalValue {
    Number(f64),
    Text(String),
}

impl DecimalValue {
    /// `None` when the value is not a finite number.
    pub fn to_f64(&self) -> Option<f64> {
        let v = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        v.is_finite().then_some(v)
    }

    pub fn raw(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for DecimalValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for DecimalValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardSnapshot {
    pub opportunity_id: String,
    pub wallet_id: String,
    pub protocol_id: String,
    pub token_id: String,

    #[serde(default)]
    pub protocol_name: Option<String>,
    #[serde(default)]
    pub token_symbol: Option<String>,

    pub amount: DecimalValue,
    #[serde(default)]
    pub usd_value: Option<DecimalValue>,
    #[serde(default)]
    pub gas_estimate_usd: Option<DecimalValue>,

    // unix seconds
    #[serde(default)]
    pub claim_deadline: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub position_id: String,
    pub wallet_id: String,
    pub protocol_id: String,

    #[serde(default)]
    pub protocol_name: Option<String>,

    #[serde(default)]
    pub health_ratio: Option<DecimalValue>,

    // free-form; may carry a `risk` object
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochSnapshot {
    pub epoch_id: String,
    pub protocol_id: String,

    #[serde(default)]
    pub protocol_name: Option<String>,

    pub starts_at: i64,
    pub ends_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Critical,
    Warning,
    Healthy,
}

/// Risk descriptor precomputed by the position sync job.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskInfo {
    Unknown,
    Known {
        level: RiskLevel,
        signals: Vec<String>,
        metrics: BTreeMap<String, f64>,
    },
}

impl RiskInfo {
    /// Reads `metadata.risk`. Anything missing or unrecognised is `Unknown`.
    pub fn from_metadata(metadata: Option<&serde_json::Value>) -> Self {
        let Some(risk) = metadata.and_then(|m| m.get("risk")) else {
            return Self::Unknown;
        };

        let level = match risk
            .get("level")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_ascii_lowercase())
            .as_deref()
        {
            Some("critical") => RiskLevel::Critical,
            Some("warning") => RiskLevel::Warning,
            Some("healthy") => RiskLevel::Healthy,
            _ => return Self::Unknown,
        };

        let signals = risk
            .get("signals")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|s| s.as_str())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let metrics = risk
            .get("metrics")
            .and_then(|v| v.as_object())
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| {
                        let n = v
                            .as_f64()
                            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))?;
                        n.is_finite().then(|| (k.clone(), n))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self::Known {
            level,
            signals,
            metrics,
        }
    }
}
