//! Delivery channel adapters (console log, webhook).

pub mod console;
pub mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{config::ChannelSettings, error::ChannelError, models::Alert};

pub use console::ConsoleChannel;
pub use webhook::WebhookChannel;

/// Result of one `deliver` call that reached the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOutcome {
    pub success: bool,
    pub metadata: Option<serde_json::Value>,
}

impl DeliveryOutcome {
    pub fn delivered(metadata: serde_json::Value) -> Self {
        Self {
            success: true,
            metadata: Some(metadata),
        }
    }

    pub fn rejected(metadata: serde_json::Value) -> Self {
        Self {
            success: false,
            metadata: Some(metadata),
        }
    }
}

/// A pluggable delivery sink.
///
/// `Err` and `Ok(DeliveryOutcome { success: false, .. })` are both recorded as
/// failed deliveries; the difference is only what ends up in the metadata.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Stable name, used as the delivery record's `channel`.
    fn name(&self) -> &str;

    async fn deliver(&self, alert: &Alert) -> Result<DeliveryOutcome, ChannelError>;
}

/// Builds the configured channels in execution order (console, then webhook).
///
/// Channels missing credentials are left out here, once, instead of failing
/// on every run.
pub fn from_settings(settings: &ChannelSettings) -> Vec<Arc<dyn ChannelAdapter>> {
    let mut channels: Vec<Arc<dyn ChannelAdapter>> = vec![];

    if settings.console_enabled && settings.allows(console::NAME) {
        channels.push(Arc::new(ConsoleChannel));
    }

    if settings.allows(webhook::NAME) {
        match &settings.webhook_url {
            Some(url) => channels.push(Arc::new(WebhookChannel::new(
                url.clone(),
                settings.webhook_token.clone(),
            ))),
            None => {
                if settings.filter.is_some() {
                    warn!("webhook channel requested but ALERT_WEBHOOK_URL is not set");
                }
            }
        }
    }

    if channels.is_empty() {
        warn!("No alert delivery channels configured");
    } else {
        info!(
            channels = ?channels.iter().map(|c| c.name().to_string()).collect::<Vec<_>>(),
            "alert delivery channels ready"
        );
    }

    channels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(settings: &ChannelSettings) -> Vec<String> {
        from_settings(settings)
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    #[test]
    fn webhook_needs_url() {
        let s = ChannelSettings::default();
        assert_eq!(names(&s), vec!["console"]);

        let s = ChannelSettings {
            webhook_url: Some("http://127.0.0.1:9/hook".into()),
            ..ChannelSettings::default()
        };
        assert_eq!(names(&s), vec!["console", "webhook"]);
    }

    #[test]
    fn filter_limits_channels() {
        let s = ChannelSettings {
            filter: Some(vec!["webhook".into()]),
            webhook_url: Some("http://127.0.0.1:9/hook".into()),
            ..ChannelSettings::default()
        };
        assert_eq!(names(&s), vec!["webhook"]);

        let s = ChannelSettings {
            filter: Some(vec!["slack".into()]),
            ..ChannelSettings::default()
        };
        assert!(names(&s).is_empty());
    }
}
