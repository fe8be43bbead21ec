//! Risk Predictor - batch-level failure risk

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::{ArrayView1, ArrayView2};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use super::{ModelMode, ScoringError};
use crate::logic::features::{extract_risk_features, FeatureSummary, LayoutSignature, RiskFeatures, RISK_FEATURE_COUNT};
use crate::logic::ingest::LogRecord;
use crate::logic::model::{ArtifactError, BoostParams, GradientBoostedTrees, ModelArtifact, ModelError};

const HIGH_RISK_THRESHOLD: f64 = 0.7;
const MEDIUM_RISK_THRESHOLD: f64 = 0.4;

const HEURISTIC_CONFIDENCE: f64 = 0.6;
const FITTED_CONFIDENCE: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLabel {
    LowRisk,
    MediumRisk,
    HighRisk,
    InsufficientData,
    Unknown,
}

impl RiskLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLabel::LowRisk => "low_risk",
            RiskLabel::MediumRisk => "medium_risk",
            RiskLabel::HighRisk => "high_risk",
            RiskLabel::InsufficientData => "insufficient_data",
            RiskLabel::Unknown => "unknown",
        }
    }
}

/// Strict comparisons: 0.7 is medium, 0.4 is low
pub fn label_for(probability: f64) -> RiskLabel {
    if probability > HIGH_RISK_THRESHOLD {
        RiskLabel::HighRisk
    } else if probability > MEDIUM_RISK_THRESHOLD {
        RiskLabel::MediumRisk
    } else {
        RiskLabel::LowRisk
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub prediction: RiskLabel,
    pub probability: f64,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RiskAssessment {
    pub fn insufficient_data() -> Self {
        Self {
            prediction: RiskLabel::InsufficientData,
            probability: 0.0,
            confidence: 0.0,
            features: None,
            error: None,
        }
    }

    pub fn unknown(error: impl Into<String>) -> Self {
        Self {
            prediction: RiskLabel::Unknown,
            probability: 0.0,
            confidence: 0.0,
            features: None,
            error: Some(error.into()),
        }
    }

    fn scored(probability: f64, confidence: f64, features: &RiskFeatures) -> Self {
        Self {
            prediction: label_for(probability),
            probability,
            confidence,
            features: Some(features.summary()),
            error: None,
        }
    }
}

pub enum RiskModel {
    Heuristic,
    Fitted(Arc<ModelArtifact<GradientBoostedTrees>>),
}

impl RiskModel {
    pub fn mode(&self) -> ModelMode {
        match self {
            RiskModel::Heuristic => ModelMode::Heuristic,
            RiskModel::Fitted(_) => ModelMode::Fitted,
        }
    }
}

/// Heuristic failure probability
pub fn heuristic_probability(features: &RiskFeatures) -> f64 {
    (features.error_rate * 0.6 + features.keyword_rate * 0.4).clamp(0.0, 1.0)
}

pub struct RiskPredictor {
    model: RwLock<Arc<RiskModel>>,
    artifact_path: PathBuf,
    params: BoostParams,
    train_lock: Mutex<()>,
}

impl RiskPredictor {
    pub fn new(artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            model: RwLock::new(Arc::new(RiskModel::Heuristic)),
            artifact_path: artifact_path.into(),
            params: BoostParams::default(),
            train_lock: Mutex::new(()),
        }
    }

    /// Load the artifact at `artifact_path` if present and valid
    pub fn load(artifact_path: impl Into<PathBuf>) -> Self {
        let predictor = Self::new(artifact_path);

        match ModelArtifact::<GradientBoostedTrees>::load(&predictor.artifact_path, &LayoutSignature::risk()) {
            Ok(artifact) => {
                log::info!("Risk model loaded ({} samples)", artifact.samples);
                *predictor.model.write() = Arc::new(RiskModel::Fitted(Arc::new(artifact)));
            }
            Err(ArtifactError::NotFound(_)) => {
                log::info!("No risk model at {}, using heuristic", predictor.artifact_path.display());
            }
            Err(e) => {
                log::warn!("Risk model rejected ({}), using heuristic", e);
            }
        }

        predictor
    }

    pub fn with_params(mut self, params: BoostParams) -> Self {
        self.params = params;
        self
    }

    pub fn mode(&self) -> ModelMode {
        self.model.read().mode()
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    /// Assess a batch (never fails)
    pub fn predict(&self, records: &[LogRecord]) -> RiskAssessment {
        if records.is_empty() {
            return RiskAssessment::insufficient_data();
        }

        let features = extract_risk_features(records);
        let model = Arc::clone(&*self.model.read());

        match model.as_ref() {
            RiskModel::Heuristic => {
                RiskAssessment::scored(heuristic_probability(&features), HEURISTIC_CONFIDENCE, &features)
            }
            RiskModel::Fitted(artifact) => match fitted_probability(artifact, &features) {
                Ok(probability) => RiskAssessment::scored(probability, FITTED_CONFIDENCE, &features),
                Err(e) => {
                    log::warn!("Risk prediction failed ({}), reporting unknown", e);
                    RiskAssessment::unknown(e.to_string())
                }
            },
        }
    }

    /// Fit from pre-extracted rows (10 columns) and 0/1 labels; false on any failure
    pub fn train(&self, features: ArrayView2<'_, f64>, labels: ArrayView1<'_, f64>) -> bool {
        let _guard = self.train_lock.lock();

        match self.fit_and_persist(features, labels) {
            Ok(artifact) => {
                log::info!("Risk model trained on {} batches", artifact.samples);
                *self.model.write() = Arc::new(RiskModel::Fitted(Arc::new(artifact)));
                true
            }
            Err(e) => {
                log::warn!("Risk training failed: {}", e);
                false
            }
        }
    }

    fn fit_and_persist(
        &self,
        features: ArrayView2<'_, f64>,
        labels: ArrayView1<'_, f64>,
    ) -> Result<ModelArtifact<GradientBoostedTrees>, ScoringError> {
        if features.ncols() != RISK_FEATURE_COUNT {
            return Err(ModelError::DimensionMismatch {
                expected: RISK_FEATURE_COUNT,
                actual: features.ncols(),
            }
            .into());
        }

        let model = GradientBoostedTrees::fit(features, labels, self.params)?;
        let artifact = ModelArtifact::new(model, LayoutSignature::risk(), features.nrows())?;
        artifact.save(&self.artifact_path)?;
        Ok(artifact)
    }
}

fn fitted_probability(
    artifact: &ModelArtifact<GradientBoostedTrees>,
    features: &RiskFeatures,
) -> Result<f64, ScoringError> {
    let probability = artifact.model.predict_proba(&features.as_array())?;
    if !probability.is_finite() {
        return Err(ScoringError::NonFinite(probability));
    }
    Ok(probability.clamp(0.0, 1.0))
}
