//! Alert Types

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Declared channel names, in dispatch order
pub const CHANNEL_SLACK: &str = "slack";
pub const CHANNEL_EMAIL: &str = "email";

// ============================================================================
// SEVERITY
// ============================================================================

/// Alert severity (selects rendering only, never routing)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    #[default]
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }

    /// Upper-case label used in subjects and fields
    pub fn label(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "INFO",
            AlertSeverity::Warning => "WARNING",
            AlertSeverity::Critical => "CRITICAL",
        }
    }

    /// Slack attachment colour
    pub fn color(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "#36a64f",
            AlertSeverity::Warning => "#ff9900",
            AlertSeverity::Critical => "#ff0000",
        }
    }
}

// ============================================================================
// ALERT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub severity: AlertSeverity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Unix seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Alert {
    pub fn new(title: &str, message: &str, severity: AlertSeverity) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            severity,
            service: None,
            timestamp: None,
        }
    }

    pub fn with_service(mut self, service: &str) -> Self {
        self.service = Some(service.to_string());
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Stamp with the current time
    pub fn now(self) -> Self {
        self.with_timestamp(Utc::now().timestamp())
    }

    pub fn test() -> Self {
        Self::new(
            "Test Alert",
            "This is a test alert from AI DevOps Monitor",
            AlertSeverity::Info,
        )
    }

    pub fn anomaly(log_id: &str, score: f64) -> Self {
        Self::new(
            "Anomaly Detected",
            &format!("Anomaly detected in log {} with score {:.2}", log_id, score),
            AlertSeverity::Warning,
        )
    }

    /// Critical above 0.7, warning otherwise
    pub fn failure_prediction(service: &str, probability: f64) -> Self {
        let severity = if probability > 0.7 {
            AlertSeverity::Critical
        } else {
            AlertSeverity::Warning
        };

        Self::new(
            "Failure Prediction Alert",
            &format!(
                "Service '{}' has {:.1}% probability of failure",
                service,
                probability * 100.0
            ),
            severity,
        )
        .with_service(service)
    }
}

// ============================================================================
// DISPATCH RESULT
// ============================================================================

/// Channel name → delivered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DispatchResult(BTreeMap<String, bool>);

impl DispatchResult {
    pub fn record(&mut self, channel: &str, success: bool) {
        self.0.insert(channel.to_string(), success);
    }

    /// False for unknown channels
    pub fn delivered(&self, channel: &str) -> bool {
        self.0.get(channel).copied().unwrap_or(false)
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.0.contains_key(channel)
    }

    pub fn any_delivered(&self) -> bool {
        self.0.values().any(|&v| v)
    }

    pub fn channels(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone)]
pub enum ChannelError {
    /// Endpoint or credentials missing
    NotConfigured,
    NetworkError { message: String },
    /// Endpoint answered with a non-success status
    Status { code: u16 },
    /// Mail could not be built (bad address or body)
    InvalidMessage(String),
    /// Channel panicked while sending
    Panicked(String),
}

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelError::NotConfigured => write!(f, "Channel not configured"),
            ChannelError::NetworkError { message } => write!(f, "Network error: {}", message),
            ChannelError::Status { code } => write!(f, "Unexpected HTTP status {}", code),
            ChannelError::InvalidMessage(msg) => write!(f, "Invalid message: {}", msg),
            ChannelError::Panicked(msg) => write!(f, "Channel panicked: {}", msg),
        }
    }
}

impl std::error::Error for ChannelError {}

impl From<ureq::Error> for ChannelError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, _) => ChannelError::Status { code },
            ureq::Error::Transport(t) => ChannelError::NetworkError {
                message: t.to_string(),
            },
        }
    }
}

impl From<lettre::transport::smtp::Error> for ChannelError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        ChannelError::NetworkError {
            message: err.to_string(),
        }
    }
}

impl From<lettre::address::AddressError> for ChannelError {
    fn from(err: lettre::address::AddressError) -> Self {
        ChannelError::InvalidMessage(err.to_string())
    }
}

impl From<lettre::error::Error> for ChannelError {
    fn from(err: lettre::error::Error) -> Self {
        ChannelError::InvalidMessage(err.to_string())
    }
}
