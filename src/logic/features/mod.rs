//! Features Module - Feature Extraction Engine
//!
//! Turns log records into fixed-shape numeric vectors:
//! - per record, for the anomaly scorer
//! - per batch, for the risk predictor

pub mod extractor;
pub mod layout;
pub mod vector;

#[cfg(test)]
mod tests;

pub use extractor::{
    contains_error_keyword, extract_risk_features, feature_matrix, risk_training_matrix,
    FeatureExtractor,
};
pub use layout::{LayoutMismatchError, LayoutSignature, FEATURE_VERSION, RISK_FEATURE_COUNT};
pub use vector::{FeatureSummary, FeatureVector, RiskFeatures};

use crate::logic::backend::BackendError;

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Clone)]
pub enum FeatureError {
    /// Embedding backend failed
    Embedding(BackendError),
    DimensionMismatch { expected: usize, actual: usize },
    /// Vectors built with different layouts
    MixedLayouts,
    EmptyInput,
    Shape(String),
}

impl std::fmt::Display for FeatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureError::Embedding(e) => write!(f, "Embedding failed: {}", e),
            FeatureError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {}, got {}", expected, actual)
            }
            FeatureError::MixedLayouts => write!(f, "Feature vectors use different layouts"),
            FeatureError::EmptyInput => write!(f, "No feature vectors"),
            FeatureError::Shape(msg) => write!(f, "Shape error: {}", msg),
        }
    }
}

impl std::error::Error for FeatureError {}

impl From<BackendError> for FeatureError {
    fn from(err: BackendError) -> Self {
        FeatureError::Embedding(err)
    }
}
