//! Scoring Module - Anomaly Scorer & Risk Predictor
//!
//! Both scorers are dual-mode: a fitted model when a valid artifact is
//! loaded, a deterministic heuristic otherwise. Scoring never fails; an
//! internal error degrades to a sentinel result.
//!
//! # Concurrency
//! Model state is a single `RwLock<Arc<_>>` cell. Readers clone the `Arc`
//! and release the lock; `train` builds the new model off to the side,
//! persists it, then swaps the `Arc`.

pub mod anomaly;
pub mod risk;

pub use anomaly::{heuristic_anomaly, normalize_decision, AnomalyModel, AnomalyResult, AnomalyScorer};
pub use risk::{label_for, RiskAssessment, RiskLabel, RiskModel, RiskPredictor};

use serde::{Deserialize, Serialize};

use crate::logic::features::FeatureError;
use crate::logic::model::{ArtifactError, ModelError};

/// Which path a scorer is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelMode {
    Heuristic,
    Fitted,
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug)]
pub enum ScoringError {
    Feature(FeatureError),
    Model(ModelError),
    Artifact(ArtifactError),
    /// Model produced NaN or infinity
    NonFinite(f64),
}

impl std::fmt::Display for ScoringError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoringError::Feature(e) => write!(f, "Feature extraction failed: {}", e),
            ScoringError::Model(e) => write!(f, "Model call failed: {}", e),
            ScoringError::Artifact(e) => write!(f, "Artifact error: {}", e),
            ScoringError::NonFinite(v) => write!(f, "Model output is not finite: {}", v),
        }
    }
}

impl std::error::Error for ScoringError {}

impl From<FeatureError> for ScoringError {
    fn from(err: FeatureError) -> Self {
        ScoringError::Feature(err)
    }
}

impl From<ModelError> for ScoringError {
    fn from(err: ModelError) -> Self {
        ScoringError::Model(err)
    }
}

impl From<ArtifactError> for ScoringError {
    fn from(err: ArtifactError) -> Self {
        ScoringError::Artifact(err)
    }
}
