//! Log sink. Always succeeds; useful as an audit trail and in tests.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::info;

use super::{ChannelAdapter, DeliveryOutcome};
use crate::{error::ChannelError, models::Alert};

pub const NAME: &str = "console";

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleChannel;

#[async_trait]
impl ChannelAdapter for ConsoleChannel {
    fn name(&self) -> &str {
        NAME
    }

    async fn deliver(&self, alert: &Alert) -> Result<DeliveryOutcome, ChannelError> {
        info!(
            target: "defiwatch::alerts",
            id = %alert.id.to_hex(),
            kind = alert.kind.as_str(),
            severity = alert.severity.as_str(),
            title = %alert.title,
            description = %alert.description,
            expires_at = ?alert.expires_at,
            "ALERT"
        );

        Ok(DeliveryOutcome::delivered(json!({
            "logged_at": Utc::now().timestamp(),
        })))
    }
}
