//! E-mail Channel
//!
//! Renders an HTML alert mail and hands it to a `MailTransport`.
//! - `SmtpMailTransport`: speaks SMTP to `SMTP_HOST:SMTP_PORT`, upgrading
//!   with STARTTLS and logging in when credentials are set
//! - `RelayTransport`: posts the rendered mail as JSON to `MAIL_RELAY_URL`
//!   (only when that is set explicitly)

use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Message, SmtpTransport, Transport};
use serde::Serialize;

use super::dispatcher::AlertChannel;
use super::types::{Alert, ChannelError, CHANNEL_EMAIL};
use crate::logic::config::EmailSettings;

/// Rendered mail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

pub fn render_email(alert: &Alert, from: &str, to: &[String]) -> EmailMessage {
    let service = alert
        .service
        .as_ref()
        .map(|s| format!("<p><strong>Service:</strong> {}</p>\n", escape_html(s)))
        .unwrap_or_default();

    let html = format!(
        "<html>
  <body>
    <h2>{title}</h2>
    <p><strong>Severity:</strong> {severity}</p>
    {service}<p><strong>Message:</strong></p>
    <p>{message}</p>
    <hr>
    <p><em>Sent by AI DevOps Monitor</em></p>
  </body>
</html>",
        title = escape_html(&alert.title),
        severity = alert.severity.label(),
        service = service,
        message = escape_html(&alert.message),
    );

    EmailMessage {
        from: from.to_string(),
        to: to.to_vec(),
        subject: format!("[{}] {}", alert.severity.label(), alert.title),
        html,
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ============================================================================
// TRANSPORT
// ============================================================================

pub trait MailTransport: Send + Sync {
    fn deliver(&self, message: &EmailMessage) -> Result<(), ChannelError>;
}

/// SMTP delivery
pub struct SmtpMailTransport {
    transport: SmtpTransport,
}

impl SmtpMailTransport {
    /// Plain SMTP, or STARTTLS + AUTH when username and password are set
    pub fn new(host: &str, settings: &EmailSettings, timeout: Duration) -> Result<Self, ChannelError> {
        let mut builder = SmtpTransport::builder_dangerous(host)
            .port(settings.port)
            .timeout(Some(timeout));

        if settings.has_credentials() {
            let user = settings.username.clone().unwrap_or_default();
            let pass = settings.password.clone().unwrap_or_default();
            let tls = TlsParameters::new(host.to_string())?;
            builder = builder.tls(Tls::Required(tls)).credentials(Credentials::new(user, pass));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

impl MailTransport for SmtpMailTransport {
    fn deliver(&self, message: &EmailMessage) -> Result<(), ChannelError> {
        let mail = build_mail(message)?;
        self.transport.send(&mail)?;
        Ok(())
    }
}

fn build_mail(message: &EmailMessage) -> Result<Message, ChannelError> {
    let from: Mailbox = message.from.parse()?;
    let mut builder = Message::builder()
        .from(from)
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_HTML);
    for recipient in &message.to {
        builder = builder.to(recipient.parse()?);
    }

    Ok(builder.body(message.html.clone())?)
}

/// JSON-over-HTTP relay; the relay owns its own SMTP session and credentials
pub struct RelayTransport {
    endpoint: String,
    agent: ureq::Agent,
}

impl RelayTransport {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        Self {
            endpoint,
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl MailTransport for RelayTransport {
    fn deliver(&self, message: &EmailMessage) -> Result<(), ChannelError> {
        let response = self.agent.post(&self.endpoint).send_json(message)?;
        if (200..300).contains(&response.status()) {
            Ok(())
        } else {
            Err(ChannelError::Status {
                code: response.status(),
            })
        }
    }
}

// ============================================================================
// CHANNEL
// ============================================================================

pub struct EmailChannel {
    from: String,
    recipients: Vec<String>,
    transport: Option<Box<dyn MailTransport>>,
}

impl EmailChannel {
    pub fn new(from: String, recipients: Vec<String>, transport: Option<Box<dyn MailTransport>>) -> Self {
        Self {
            from,
            recipients,
            transport,
        }
    }

    /// Relay when `MAIL_RELAY_URL` is set, SMTP to the mail host otherwise
    pub fn from_settings(settings: &EmailSettings, timeout: Duration) -> Self {
        let transport: Option<Box<dyn MailTransport>> = if !settings.is_configured() {
            None
        } else if let Some(ref endpoint) = settings.relay_url {
            Some(Box::new(RelayTransport::new(endpoint.clone(), timeout)))
        } else if let Some(ref host) = settings.host {
            match SmtpMailTransport::new(host, settings, timeout) {
                Ok(smtp) => Some(Box::new(smtp)),
                Err(e) => {
                    log::warn!("SMTP transport for {} unavailable: {}", host, e);
                    None
                }
            }
        } else {
            None
        };

        Self::new(settings.from_email.clone(), settings.recipients.clone(), transport)
    }
}

impl AlertChannel for EmailChannel {
    fn name(&self) -> &'static str {
        CHANNEL_EMAIL
    }

    fn is_configured(&self) -> bool {
        self.transport.is_some() && !self.recipients.is_empty()
    }

    fn send(&self, alert: &Alert) -> Result<(), ChannelError> {
        let transport = self.transport.as_ref().ok_or(ChannelError::NotConfigured)?;
        if self.recipients.is_empty() {
            return Err(ChannelError::NotConfigured);
        }

        let message = render_email(alert, &self.from, &self.recipients);
        transport.deliver(&message)?;
        log::info!("Alert '{}' mailed to {} recipient(s)", alert.title, self.recipients.len());
        Ok(())
    }
}
