//! Generic JSON webhook sink.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use super::{ChannelAdapter, DeliveryOutcome};
use crate::{
    error::ChannelError,
    models::{Alert, AlertRefs},
};

pub const NAME: &str = "webhook";

/// Response bodies longer than this are cut before landing in delivery metadata.
const MAX_BODY_CHARS: usize = 2000;

pub struct WebhookChannel {
    url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new(url: String, token: Option<String>) -> Self {
        Self {
            url,
            token,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    id: String,
    fingerprint: &'a str,
    kind: &'static str,
    severity: &'static str,
    status: &'static str,
    title: &'a str,
    description: &'a str,
    trigger_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
    references: &'a AlertRefs,
    metadata: &'a serde_json::Value,
}

impl<'a> From<&'a Alert> for WebhookPayload<'a> {
    fn from(a: &'a Alert) -> Self {
        Self {
            id: a.id.to_hex(),
            fingerprint: &a.fingerprint,
            kind: a.kind.as_str(),
            severity: a.severity.as_str(),
            status: a.status.as_str(),
            title: &a.title,
            description: &a.description,
            trigger_at: a.trigger_at,
            expires_at: a.expires_at,
            references: &a.references,
            metadata: &a.metadata,
        }
    }
}

fn truncate(body: String) -> String {
    if body.chars().count() <= MAX_BODY_CHARS {
        return body;
    }
    body.chars().take(MAX_BODY_CHARS).collect()
}

#[async_trait]
impl ChannelAdapter for WebhookChannel {
    fn name(&self) -> &str {
        NAME
    }

    async fn deliver(&self, alert: &Alert) -> Result<DeliveryOutcome, ChannelError> {
        let payload = WebhookPayload::from(alert);

        let mut req = self.client.post(&self.url).json(&payload);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        debug!(channel = NAME, alert = %alert.id.to_hex(), "posting alert webhook");

        let res = req.send().await?;
        let status = res.status();
        let body = truncate(res.text().await.unwrap_or_default());

        let meta = json!({ "status": status.as_u16(), "body": body });

        if status.is_success() {
            Ok(DeliveryOutcome::delivered(meta))
        } else {
            warn!(
                channel = NAME,
                status = %status,
                body = %body,
                "alert webhook rejected"
            );
            Ok(DeliveryOutcome::rejected(meta))
        }
    }
}
