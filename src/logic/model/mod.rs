//! Model Module - Fitted models and their persistence
//!
//! Pure Rust models, no runtime downloads:
//! - `IsolationForest` for per-record anomaly scoring
//! - `GradientBoostedTrees` for batch failure risk
//!
//! Both persist through `ModelArtifact`.

pub mod artifact;
pub mod gradient_boost;
pub mod isolation_forest;

pub use artifact::{ArtifactError, ArtifactModel, ModelArtifact};
pub use gradient_boost::{BoostParams, GradientBoostedTrees};
pub use isolation_forest::{ForestParams, IsolationForest};

#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    EmptyInput,
    InvalidInput(String),
    DimensionMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::EmptyInput => write!(f, "No training data"),
            ModelError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            ModelError::DimensionMismatch { expected, actual } => {
                write!(f, "Model expects {} features, got {}", expected, actual)
            }
        }
    }
}

impl std::error::Error for ModelError {}
