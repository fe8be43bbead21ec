//! Response Module - Alert delivery
//!
//! # Components
//! - `types.rs`: `Alert`, `AlertSeverity`, `DispatchResult`
//! - `webhook.rs`: Slack incoming-webhook channel
//! - `email.rs`: HTML e-mail channel over SMTP (or an explicit HTTP relay)
//! - `dispatcher.rs`: per-channel isolated fan-out

pub mod dispatcher;
pub mod email;
pub mod types;
pub mod webhook;

pub use dispatcher::{AlertChannel, AlertDispatcher, AlertHistoryEntry, DispatchStats};
pub use email::{render_email, EmailChannel, EmailMessage, MailTransport, RelayTransport, SmtpMailTransport};
pub use types::{Alert, AlertSeverity, ChannelError, DispatchResult, CHANNEL_EMAIL, CHANNEL_SLACK};
pub use webhook::{format_slack, SlackChannel};
