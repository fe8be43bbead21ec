//! Backend Module - Optional text backends
//!
//! Two capabilities, both optional:
//! - `TextEncoder`: message embeddings for anomaly features
//! - `TextGenerator`: free-text completion for narratives
//!
//! When a capability is absent the pipeline uses its fallback path.

pub mod ollama;

pub use ollama::OllamaClient;

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Clone)]
pub enum BackendError {
    /// Backend switched off or never configured
    Unavailable(String),
    /// Transport failure (connect, DNS, timeout)
    NetworkError { message: String },
    /// Non-success HTTP status
    Status { code: u16 },
    /// Response body did not have the expected shape
    InvalidResponse(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Unavailable(msg) => write!(f, "Backend unavailable: {}", msg),
            BackendError::NetworkError { message } => write!(f, "Network error: {}", message),
            BackendError::Status { code } => write!(f, "Backend returned HTTP {}", code),
            BackendError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<ureq::Error> for BackendError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, _) => BackendError::Status { code },
            ureq::Error::Transport(t) => BackendError::NetworkError {
                message: t.to_string(),
            },
        }
    }
}

// ============================================================================
// CAPABILITIES
// ============================================================================

/// Text embedding capability
pub trait TextEncoder: Send + Sync {
    /// Stable identifier of the embedding model (part of the feature layout)
    fn id(&self) -> &str;

    /// Length of every vector `encode` returns
    fn dimension(&self) -> usize;

    fn encode(&self, text: &str) -> Result<Vec<f64>, BackendError>;
}

/// Generative text capability
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    fn complete(&self, prompt: &str) -> Result<String, BackendError>;
}
