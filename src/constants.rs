//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Environment overrides are read in `logic::config::Settings`.

use std::path::PathBuf;

/// App name
pub const APP_NAME: &str = "DevOps Monitor";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directory under the platform data dir holding models and the log DB
pub const DATA_DIR_NAME: &str = "devops-monitor";

// ============================================
// Backends
// ============================================

/// Default Ollama server URL
pub const DEFAULT_OLLAMA_URL: &str = "http://ollama:11434";

/// Default generative model
pub const DEFAULT_OLLAMA_MODEL: &str = "mistral";

/// Default embedding model (384-dim)
pub const DEFAULT_EMBED_MODEL: &str = "all-minilm";

/// Dimension produced by `DEFAULT_EMBED_MODEL`
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Generation can be slow on CPU-only hosts
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

/// Embeddings run once per scored record
pub const DEFAULT_EMBED_TIMEOUT_SECS: u64 = 5;

// ============================================
// Alerting
// ============================================

/// Default SMTP port
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address
pub const DEFAULT_FROM_EMAIL: &str = "devops@example.com";

/// Per-channel delivery timeout (seconds)
pub const DEFAULT_ALERT_TIMEOUT_SECS: u64 = 10;

// ============================================
// Analysis windows
// ============================================

/// Records pulled for a full batch analysis
pub const BATCH_WINDOW: usize = 200;

/// Records pulled for a per-service risk prediction
pub const PREDICT_WINDOW: usize = 100;

/// Default limit for anomaly listing
pub const DEFAULT_SEARCH_LIMIT: usize = 100;

/// Anomalies forwarded to the narrative summarizer
pub const TOP_ANOMALIES: usize = 5;

/// Records rendered into a narrative
pub const NARRATIVE_MAX_RECORDS: usize = 10;

/// Messages containing any of these (case-insensitive) count as failure-related
pub const ERROR_KEYWORDS: [&str; 5] = ["exception", "failed", "error", "timeout", "crash"];

// ============================================
// Files
// ============================================

pub const ANOMALY_MODEL_FILE: &str = "anomaly_model.json";
pub const RISK_MODEL_FILE: &str = "predictor_model.json";
pub const LOG_DB_FILE: &str = "logs.db";

/// Base data directory (falls back to the working directory)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

/// Get model directory from environment or use default
pub fn get_model_dir() -> PathBuf {
    std::env::var("MODEL_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| get_data_dir().join("models"))
}

/// Get log database path from environment or use default
pub fn get_log_db_path() -> PathBuf {
    std::env::var("LOG_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| get_data_dir().join(LOG_DB_FILE))
}
