pub mod alert;
pub mod delivery;
pub mod snapshot;

pub use alert::{
    Alert, AlertCandidate, AlertFields, AlertKind, AlertRefs, AlertSeverity, AlertStatus, Upserted,
};
pub use delivery::{ACK_CHANNEL, Delivery, NewDelivery};
pub use snapshot::{
    DecimalValue, EpochSnapshot, PositionSnapshot, RewardSnapshot, RiskInfo, RiskLevel,
};
