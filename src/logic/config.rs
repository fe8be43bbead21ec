//! Runtime settings
//!
//! Everything is read from the process environment. A missing value is not
//! an error: the matching backend or channel simply stays unconfigured and
//! the pipeline runs in its degraded mode.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    self, DEFAULT_ALERT_TIMEOUT_SECS, DEFAULT_EMBEDDING_DIM, DEFAULT_EMBED_MODEL, DEFAULT_EMBED_TIMEOUT_SECS,
    DEFAULT_FROM_EMAIL, DEFAULT_LLM_TIMEOUT_SECS, DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL,
    DEFAULT_SMTP_PORT,
};

/// E-mail delivery settings
#[derive(Debug, Clone, Default)]
pub struct EmailSettings {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_email: String,
    pub recipients: Vec<String>,
    /// Optional HTTP mail relay; SMTP is used when unset
    pub relay_url: Option<String>,
}

impl EmailSettings {
    /// A mail host (or relay) and at least one recipient are required
    pub fn is_configured(&self) -> bool {
        (self.host.is_some() || self.relay_url.is_some()) && !self.recipients.is_empty()
    }

    /// STARTTLS + login only when both are present
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

/// Ollama backend settings
#[derive(Debug, Clone)]
pub struct OllamaSettings {
    pub base_url: String,
    pub model: String,
    pub embed_model: String,
    pub embedding_dim: usize,
    /// Generation timeout
    pub timeout: Duration,
    /// Per-record embedding timeout
    pub embed_timeout: Duration,
}

/// Application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub slack_webhook_url: Option<String>,
    pub email: EmailSettings,
    pub ollama: OllamaSettings,
    /// Use the embedding backend for anomaly features
    pub embeddings_enabled: bool,
    /// Use the generative backend for narratives
    pub llm_enabled: bool,
    pub model_dir: PathBuf,
    pub log_db_path: PathBuf,
    pub alert_timeout: Duration,
}

impl Settings {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let email = EmailSettings {
            host: env_string("SMTP_HOST"),
            port: env_parse("SMTP_PORT").unwrap_or(DEFAULT_SMTP_PORT),
            username: env_string("SMTP_USERNAME"),
            password: env_string("SMTP_PASSWORD"),
            from_email: env_string("SMTP_FROM_EMAIL")
                .unwrap_or_else(|| DEFAULT_FROM_EMAIL.to_string()),
            recipients: parse_recipients(&env::var("ALERT_EMAIL_RECIPIENTS").unwrap_or_default()),
            relay_url: env_string("MAIL_RELAY_URL"),
        };

        let ollama = OllamaSettings {
            base_url: env_string("OLLAMA_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            model: env_string("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            embed_model: env_string("OLLAMA_EMBED_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBED_MODEL.to_string()),
            embedding_dim: env_parse("EMBEDDING_DIM").unwrap_or(DEFAULT_EMBEDDING_DIM),
            timeout: Duration::from_secs(
                env_parse("LLM_TIMEOUT_SECS").unwrap_or(DEFAULT_LLM_TIMEOUT_SECS),
            ),
            embed_timeout: Duration::from_secs(
                env_parse("EMBED_TIMEOUT_SECS").unwrap_or(DEFAULT_EMBED_TIMEOUT_SECS),
            ),
        };

        Self {
            slack_webhook_url: env_string("SLACK_WEBHOOK_URL"),
            email,
            ollama,
            embeddings_enabled: env_flag("EMBEDDINGS_ENABLED", false),
            llm_enabled: env_flag("LLM_ENABLED", true),
            model_dir: constants::get_model_dir(),
            log_db_path: constants::get_log_db_path(),
            alert_timeout: Duration::from_secs(
                env_parse("ALERT_TIMEOUT_SECS").unwrap_or(DEFAULT_ALERT_TIMEOUT_SECS),
            ),
        }
    }

    pub fn anomaly_model_path(&self) -> PathBuf {
        self.model_dir.join(constants::ANOMALY_MODEL_FILE)
    }

    pub fn risk_model_path(&self) -> PathBuf {
        self.model_dir.join(constants::RISK_MODEL_FILE)
    }
}

impl Default for Settings {
    /// Everything unconfigured, models kept under the default data dir
    fn default() -> Self {
        Self {
            slack_webhook_url: None,
            email: EmailSettings {
                port: DEFAULT_SMTP_PORT,
                from_email: DEFAULT_FROM_EMAIL.to_string(),
                ..Default::default()
            },
            ollama: OllamaSettings {
                base_url: DEFAULT_OLLAMA_URL.to_string(),
                model: DEFAULT_OLLAMA_MODEL.to_string(),
                embed_model: DEFAULT_EMBED_MODEL.to_string(),
                embedding_dim: DEFAULT_EMBEDDING_DIM,
                timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
                embed_timeout: Duration::from_secs(DEFAULT_EMBED_TIMEOUT_SECS),
            },
            embeddings_enabled: false,
            llm_enabled: false,
            model_dir: constants::get_data_dir().join("models"),
            log_db_path: constants::get_data_dir().join(constants::LOG_DB_FILE),
            alert_timeout: Duration::from_secs(DEFAULT_ALERT_TIMEOUT_SECS),
        }
    }
}

/// Parse email recipients from a comma-separated string
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Non-empty string variable
fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|s| {
            let s = s.trim().to_lowercase();
            s != "false" && s != "0" && s != "no"
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recipients() {
        assert_eq!(
            parse_recipients(" ops@example.com, ,dev@example.com,"),
            vec!["ops@example.com".to_string(), "dev@example.com".to_string()]
        );
        assert!(parse_recipients("").is_empty());
    }

    #[test]
    fn test_email_configuration_requires_host_and_recipients() {
        let mut email = Settings::default().email;
        assert!(!email.is_configured());

        email.host = Some("smtp.example.com".to_string());
        assert!(!email.is_configured());

        email.recipients = vec!["ops@example.com".to_string()];
        assert!(email.is_configured());
        assert!(!email.has_credentials());

        email.host = None;
        email.relay_url = Some("http://relay.internal/send".to_string());
        assert!(email.is_configured());
    }

    #[test]
    fn test_default_settings_are_unconfigured() {
        let settings = Settings::default();
        assert!(settings.slack_webhook_url.is_none());
        assert!(!settings.llm_enabled);
        assert!(!settings.embeddings_enabled);
        assert_eq!(settings.alert_timeout, Duration::from_secs(10));
        assert!(settings.ollama.embed_timeout < settings.ollama.timeout);
    }
}
