//! Slack Webhook Channel
//!
//! Posts an attachment-style message to an incoming webhook.
//! Delivery succeeds only on HTTP 200.

use std::time::Duration;

use super::dispatcher::AlertChannel;
use super::types::{Alert, ChannelError, CHANNEL_SLACK};

const FOOTER: &str = "AI DevOps Monitor";

pub struct SlackChannel {
    webhook_url: Option<String>,
    agent: ureq::Agent,
}

impl SlackChannel {
    pub fn new(webhook_url: Option<String>, timeout: Duration) -> Self {
        Self {
            webhook_url,
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl AlertChannel for SlackChannel {
    fn name(&self) -> &'static str {
        CHANNEL_SLACK
    }

    fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    fn send(&self, alert: &Alert) -> Result<(), ChannelError> {
        let url = self.webhook_url.as_ref().ok_or(ChannelError::NotConfigured)?;

        let response = self
            .agent
            .post(url)
            .set("Content-Type", "application/json")
            .send_string(&format_slack(alert).to_string())?;

        match response.status() {
            200 => {
                log::info!("Alert '{}' sent to Slack", alert.title);
                Ok(())
            }
            code => Err(ChannelError::Status { code }),
        }
    }
}

/// Slack attachment payload
pub fn format_slack(alert: &Alert) -> serde_json::Value {
    let mut fields = vec![serde_json::json!({
        "title": "Severity",
        "value": alert.severity.label(),
        "short": true
    })];

    if let Some(ref service) = alert.service {
        fields.push(serde_json::json!({
            "title": "Service",
            "value": service,
            "short": true
        }));
    }

    let mut attachment = serde_json::json!({
        "color": alert.severity.color(),
        "title": alert.title,
        "text": alert.message,
        "fields": fields,
        "footer": FOOTER,
    });

    if let Some(ts) = alert.timestamp {
        attachment["ts"] = serde_json::json!(ts);
    }

    serde_json::json!({ "attachments": [attachment] })
}
