use std::collections::BTreeMap;

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    RewardClaim,
    PositionHealth,
    GovernanceEpoch,
}

impl AlertKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RewardClaim => "reward_claim",
            Self::PositionHealth => "position_health",
            Self::GovernanceEpoch => "governance_epoch",
        }
    }
}

/// Ordered so that `Critical > Warning > Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Pending,
    Dispatched,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    /// Statuses that are still subject to dispatch and stale-closing.
    pub const OPEN: [AlertStatus; 2] = [AlertStatus::Pending, AlertStatus::Dispatched];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Dispatched => "dispatched",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "dispatched" => Some(Self::Dispatched),
            "acknowledged" => Some(Self::Acknowledged),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        Self::OPEN.contains(self)
    }
}

/// Denormalized links to the entities an alert is about. Display only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertRefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opportunity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub fingerprint: String,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub status: AlertStatus,

    pub title: String,
    pub description: String,

    pub trigger_at: i64,
    #[serde(default)]
    pub expires_at: Option<i64>,

    #[serde(default)]
    pub references: AlertRefs,
    #[serde(default)]
    pub metadata: serde_json::Value,

    pub created_at: i64,
    pub updated_at: i64,
}

/// What an evaluator produces for one triggering entity.
///
/// `identity` holds the natural keys of the condition and is the only input
/// to the fingerprint besides `kind`. Everything else may change between runs
/// without creating a new alert.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertCandidate {
    pub kind: AlertKind,
    pub identity: BTreeMap<String, String>,
    pub severity: AlertSeverity,
    pub title: String,
    pub description: String,
    pub expires_at: Option<i64>,
    pub references: AlertRefs,
    pub metadata: serde_json::Value,
}

impl AlertCandidate {
    pub fn new(kind: AlertKind, identity: &[(&str, &str)]) -> Self {
        Self {
            kind,
            identity: identity
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            severity: AlertSeverity::Info,
            title: String::new(),
            description: String::new(),
            expires_at: None,
            references: AlertRefs::default(),
            metadata: serde_json::Value::Null,
        }
    }
}

/// Mutable fields written on every upsert.
#[derive(Debug, Clone)]
pub struct AlertFields {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub description: String,
    pub expires_at: Option<i64>,
    pub references: AlertRefs,
    pub metadata: serde_json::Value,
}

impl From<AlertCandidate> for AlertFields {
    fn from(c: AlertCandidate) -> Self {
        Self {
            kind: c.kind,
            severity: c.severity,
            title: c.title,
            description: c.description,
            expires_at: c.expires_at,
            references: c.references,
            metadata: c.metadata,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Upserted {
    pub alert: Alert,
    pub created: bool,
}
