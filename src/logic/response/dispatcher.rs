//! Alert Dispatcher
//!
//! Fans an alert out to every declared channel. Channels are isolated:
//! an unconfigured, failing or panicking channel is reported `false`
//! and the next one is still attempted.

use std::panic::{self, AssertUnwindSafe};

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use super::email::EmailChannel;
use super::types::{Alert, ChannelError, DispatchResult};
use super::webhook::SlackChannel;
use crate::logic::config::Settings;

/// One delivery mechanism
pub trait AlertChannel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Endpoint/credentials present
    fn is_configured(&self) -> bool;

    fn send(&self, alert: &Alert) -> Result<(), ChannelError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertHistoryEntry {
    pub alert: Alert,
    pub channel: String,
    pub attempted: bool,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchStats {
    pub channels: usize,
    pub configured_channels: usize,
    pub alerts_sent: usize,
    pub alerts_failed: usize,
}

pub struct AlertDispatcher {
    channels: Vec<Box<dyn AlertChannel>>,
    history: RwLock<Vec<AlertHistoryEntry>>,
    max_history: usize,
}

impl AlertDispatcher {
    pub fn new(channels: Vec<Box<dyn AlertChannel>>) -> Self {
        Self {
            channels,
            history: RwLock::new(Vec::new()),
            max_history: 100,
        }
    }

    /// Slack + e-mail, each bounded by the alert timeout
    pub fn from_settings(settings: &Settings) -> Self {
        let slack = SlackChannel::new(settings.slack_webhook_url.clone(), settings.alert_timeout);
        let email = EmailChannel::from_settings(&settings.email, settings.alert_timeout);

        let dispatcher = Self::new(vec![Box::new(slack), Box::new(email)]);
        log::info!(
            "Alert channels: {}",
            dispatcher
                .channels
                .iter()
                .map(|c| format!("{}={}", c.name(), if c.is_configured() { "on" } else { "off" }))
                .collect::<Vec<_>>()
                .join(", ")
        );
        dispatcher
    }

    /// Deliver to every channel (never fails)
    pub fn dispatch(&self, alert: &Alert) -> DispatchResult {
        let mut result = DispatchResult::default();

        for channel in &self.channels {
            let (attempted, outcome) = if channel.is_configured() {
                (true, send_isolated(channel.as_ref(), alert))
            } else {
                log::debug!("Channel {} not configured, skipping", channel.name());
                (false, Err(ChannelError::NotConfigured))
            };

            if let Err(ref e) = outcome {
                if attempted {
                    log::error!("Failed to send alert via {}: {}", channel.name(), e);
                }
            }

            result.record(channel.name(), outcome.is_ok());
            self.remember(AlertHistoryEntry {
                alert: alert.clone(),
                channel: channel.name().to_string(),
                attempted,
                success: outcome.is_ok(),
                error: outcome.err().map(|e| e.to_string()),
                timestamp: Utc::now().timestamp(),
            });
        }

        result
    }

    fn remember(&self, entry: AlertHistoryEntry) {
        let mut history = self.history.write();
        history.push(entry);
        if history.len() > self.max_history {
            let excess = history.len() - self.max_history;
            history.drain(0..excess);
        }
    }

    /// Newest last
    pub fn history(&self) -> Vec<AlertHistoryEntry> {
        self.history.read().clone()
    }

    pub fn stats(&self) -> DispatchStats {
        let (sent, failed) = self
            .history
            .read()
            .iter()
            .filter(|e| e.attempted)
            .fold((0, 0), |(s, f), e| if e.success { (s + 1, f) } else { (s, f + 1) });

        DispatchStats {
            channels: self.channels.len(),
            configured_channels: self.channels.iter().filter(|c| c.is_configured()).count(),
            alerts_sent: sent,
            alerts_failed: failed,
        }
    }
}

fn send_isolated(channel: &dyn AlertChannel, alert: &Alert) -> Result<(), ChannelError> {
    panic::catch_unwind(AssertUnwindSafe(|| channel.send(alert))).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(ChannelError::Panicked(message))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::response::{CHANNEL_EMAIL, CHANNEL_SLACK};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Copy)]
    enum Behavior {
        Deliver,
        Fail,
        Panic,
    }

    struct FakeChannel {
        name: &'static str,
        configured: bool,
        behavior: Behavior,
        attempts: Arc<AtomicUsize>,
    }

    impl FakeChannel {
        fn boxed(name: &'static str, configured: bool, behavior: Behavior) -> (Box<dyn AlertChannel>, Arc<AtomicUsize>) {
            let attempts = Arc::new(AtomicUsize::new(0));
            let channel = FakeChannel {
                name,
                configured,
                behavior,
                attempts: attempts.clone(),
            };
            (Box::new(channel), attempts)
        }
    }

    impl AlertChannel for FakeChannel {
        fn name(&self) -> &'static str {
            self.name
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        fn send(&self, _alert: &Alert) -> Result<(), ChannelError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Deliver => Ok(()),
                Behavior::Fail => Err(ChannelError::NetworkError {
                    message: "connection refused".into(),
                }),
                Behavior::Panic => panic!("channel exploded"),
            }
        }
    }

    #[test]
    fn test_no_channels_configured() {
        let dispatcher = AlertDispatcher::from_settings(&Settings::default());
        let result = dispatcher.dispatch(&Alert::test());

        assert_eq!(result.len(), 2);
        assert!(result.contains(CHANNEL_SLACK));
        assert!(result.contains(CHANNEL_EMAIL));
        assert!(!result.any_delivered());
        assert_eq!(dispatcher.stats().alerts_failed, 0);
    }

    #[test]
    fn test_unconfigured_channel_not_attempted() {
        let (slack, slack_attempts) = FakeChannel::boxed(CHANNEL_SLACK, false, Behavior::Deliver);
        let (email, email_attempts) = FakeChannel::boxed(CHANNEL_EMAIL, true, Behavior::Deliver);
        let dispatcher = AlertDispatcher::new(vec![slack, email]);

        let result = dispatcher.dispatch(&Alert::test());
        assert!(!result.delivered(CHANNEL_SLACK));
        assert!(result.delivered(CHANNEL_EMAIL));
        assert_eq!(slack_attempts.load(Ordering::SeqCst), 0);
        assert_eq!(email_attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_first_channel_failure_does_not_block_second() {
        let (slack, _) = FakeChannel::boxed(CHANNEL_SLACK, true, Behavior::Fail);
        let (email, email_attempts) = FakeChannel::boxed(CHANNEL_EMAIL, true, Behavior::Deliver);
        let dispatcher = AlertDispatcher::new(vec![slack, email]);

        let result = dispatcher.dispatch(&Alert::test());
        assert!(!result.delivered(CHANNEL_SLACK));
        assert!(result.delivered(CHANNEL_EMAIL));
        assert_eq!(email_attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_second_channel_failure_does_not_undo_first() {
        let (slack, slack_attempts) = FakeChannel::boxed(CHANNEL_SLACK, true, Behavior::Deliver);
        let (email, _) = FakeChannel::boxed(CHANNEL_EMAIL, true, Behavior::Fail);
        let dispatcher = AlertDispatcher::new(vec![slack, email]);

        let result = dispatcher.dispatch(&Alert::test());
        assert!(result.delivered(CHANNEL_SLACK));
        assert!(!result.delivered(CHANNEL_EMAIL));
        assert_eq!(slack_attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_channel_is_contained() {
        let (slack, _) = FakeChannel::boxed(CHANNEL_SLACK, true, Behavior::Panic);
        let (email, email_attempts) = FakeChannel::boxed(CHANNEL_EMAIL, true, Behavior::Deliver);
        let dispatcher = AlertDispatcher::new(vec![slack, email]);

        let result = dispatcher.dispatch(&Alert::failure_prediction("db", 0.9));
        assert!(!result.delivered(CHANNEL_SLACK));
        assert!(result.delivered(CHANNEL_EMAIL));
        assert_eq!(email_attempts.load(Ordering::SeqCst), 1);

        let history = dispatcher.history();
        assert!(history[0].error.as_deref().unwrap_or("").contains("channel exploded"));
    }

    #[test]
    fn test_severity_never_gates_attempts() {
        let (slack, slack_attempts) = FakeChannel::boxed(CHANNEL_SLACK, true, Behavior::Deliver);
        let dispatcher = AlertDispatcher::new(vec![slack]);

        dispatcher.dispatch(&Alert::test());
        dispatcher.dispatch(&Alert::anomaly("id", 0.6));
        dispatcher.dispatch(&Alert::failure_prediction("db", 0.95));
        assert_eq!(slack_attempts.load(Ordering::SeqCst), 3);
        assert_eq!(dispatcher.stats().alerts_sent, 3);
    }

    #[test]
    fn test_history_is_bounded() {
        let (slack, _) = FakeChannel::boxed(CHANNEL_SLACK, true, Behavior::Deliver);
        let dispatcher = AlertDispatcher::new(vec![slack]);
        for _ in 0..150 {
            dispatcher.dispatch(&Alert::test());
        }
        assert_eq!(dispatcher.history().len(), 100);
    }
}
