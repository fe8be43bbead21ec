//! Anomaly Scorer - per-record anomaly detection

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use super::{ModelMode, ScoringError};
use crate::logic::features::{contains_error_keyword, FeatureExtractor};
use crate::logic::ingest::LogRecord;
use crate::logic::model::{ArtifactError, ForestParams, IsolationForest, ModelArtifact};

/// Raw decision values above this are anomalies
pub const DECISION_THRESHOLD: f64 = 0.5;

const HEURISTIC_ANOMALY_SCORE: f64 = 0.8;
const HEURISTIC_NORMAL_SCORE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub is_anomaly: bool,
    /// 0.0 - 1.0
    pub score: f64,
}

impl AnomalyResult {
    /// Result reported when scoring failed internally
    pub fn degraded() -> Self {
        Self {
            is_anomaly: false,
            score: 0.0,
        }
    }
}

pub enum AnomalyModel {
    Heuristic,
    Fitted(Arc<ModelArtifact<IsolationForest>>),
}

impl AnomalyModel {
    pub fn mode(&self) -> ModelMode {
        match self {
            AnomalyModel::Heuristic => ModelMode::Heuristic,
            AnomalyModel::Fitted(_) => ModelMode::Fitted,
        }
    }
}

// ============================================================================
// PURE RULES
// ============================================================================

/// Rule used when no fitted model is loaded
pub fn heuristic_anomaly(record: &LogRecord) -> AnomalyResult {
    if record.level.is_error() || contains_error_keyword(&record.message) {
        AnomalyResult {
            is_anomaly: true,
            score: HEURISTIC_ANOMALY_SCORE,
        }
    } else {
        AnomalyResult {
            is_anomaly: false,
            score: HEURISTIC_NORMAL_SCORE,
        }
    }
}

/// Map a raw decision value to [0, 1]
pub fn normalize_decision(raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    ((raw + 0.5) / 1.5).clamp(0.0, 1.0)
}

// ============================================================================
// SCORER
// ============================================================================

pub struct AnomalyScorer {
    extractor: FeatureExtractor,
    model: RwLock<Arc<AnomalyModel>>,
    artifact_path: PathBuf,
    params: ForestParams,
    train_lock: Mutex<()>,
}

impl AnomalyScorer {
    /// Scorer in heuristic mode; `train` writes to `artifact_path`
    pub fn new(extractor: FeatureExtractor, artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            extractor,
            model: RwLock::new(Arc::new(AnomalyModel::Heuristic)),
            artifact_path: artifact_path.into(),
            params: ForestParams::default(),
            train_lock: Mutex::new(()),
        }
    }

    /// Load the artifact at `artifact_path` if present and valid
    pub fn load(extractor: FeatureExtractor, artifact_path: impl Into<PathBuf>) -> Self {
        let scorer = Self::new(extractor, artifact_path);
        let layout = scorer.extractor.anomaly_layout();

        match ModelArtifact::<IsolationForest>::load(&scorer.artifact_path, &layout) {
            Ok(artifact) => {
                log::info!(
                    "Anomaly model loaded ({} trees, trained {})",
                    artifact.model.num_trees(),
                    artifact.trained_at
                );
                *scorer.model.write() = Arc::new(AnomalyModel::Fitted(Arc::new(artifact)));
            }
            Err(ArtifactError::NotFound(_)) => {
                log::info!("No anomaly model at {}, using heuristic", scorer.artifact_path.display());
            }
            Err(e) => {
                log::warn!("Anomaly model rejected ({}), using heuristic", e);
            }
        }

        scorer
    }

    pub fn with_params(mut self, params: ForestParams) -> Self {
        self.params = params;
        self
    }

    pub fn mode(&self) -> ModelMode {
        self.model.read().mode()
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Score one record (never fails)
    pub fn detect(&self, record: &LogRecord) -> AnomalyResult {
        let model = Arc::clone(&*self.model.read());

        match model.as_ref() {
            AnomalyModel::Heuristic => heuristic_anomaly(record),
            AnomalyModel::Fitted(artifact) => match self.score_fitted(artifact, record) {
                Ok(result) => result,
                Err(e) => {
                    log::warn!("Anomaly scoring failed ({}), degrading", e);
                    AnomalyResult::degraded()
                }
            },
        }
    }

    fn score_fitted(
        &self,
        artifact: &ModelArtifact<IsolationForest>,
        record: &LogRecord,
    ) -> Result<AnomalyResult, ScoringError> {
        let vector = self.extractor.extract_anomaly_features(record)?;
        let raw = artifact.model.decision_function(vector.as_slice())?;
        if raw.is_nan() {
            return Err(ScoringError::NonFinite(raw));
        }

        Ok(AnomalyResult {
            is_anomaly: raw > DECISION_THRESHOLD,
            score: normalize_decision(raw),
        })
    }

    /// Fit, persist and swap in a new model; false on any failure
    pub fn train(&self, records: &[LogRecord]) -> bool {
        let _guard = self.train_lock.lock();

        match self.fit_and_persist(records) {
            Ok(artifact) => {
                *self.model.write() = Arc::new(AnomalyModel::Fitted(Arc::new(artifact)));
                log::info!("Anomaly model trained on {} records", records.len());
                true
            }
            Err(e) => {
                log::warn!("Anomaly training failed: {}", e);
                false
            }
        }
    }

    fn fit_and_persist(&self, records: &[LogRecord]) -> Result<ModelArtifact<IsolationForest>, ScoringError> {
        let matrix = self.extractor.anomaly_matrix(records)?;
        let forest = IsolationForest::fit(matrix.view(), self.params)?;
        let artifact = ModelArtifact::new(forest, self.extractor.anomaly_layout(), matrix.nrows())?;
        artifact.save(&self.artifact_path)?;
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::backend::{BackendError, TextEncoder};
    use crate::logic::ingest::LogLevel;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Encoder that can be taken offline after training
    struct SwitchableEncoder {
        online: AtomicBool,
    }

    impl TextEncoder for SwitchableEncoder {
        fn id(&self) -> &str {
            "switchable"
        }

        fn dimension(&self) -> usize {
            2
        }

        fn encode(&self, text: &str) -> Result<Vec<f64>, BackendError> {
            if !self.online.load(Ordering::SeqCst) {
                return Err(BackendError::Unavailable("embedding backend offline".into()));
            }
            let words = text.split_whitespace().count() as f64;
            Ok(vec![words, text.len() as f64 / 10.0])
        }
    }

    fn scorer(dir: &tempfile::TempDir) -> AnomalyScorer {
        AnomalyScorer::new(FeatureExtractor::default(), dir.path().join("anomaly_model.json"))
            .with_params(ForestParams {
                num_trees: 50,
                ..Default::default()
            })
    }

    /// Info records with message lengths spread over 100 values
    fn normal_records(n: usize) -> Vec<LogRecord> {
        (0..n)
            .map(|i| LogRecord::new(LogLevel::Info, "user-service", request_message(i % 100)))
            .collect()
    }

    fn request_message(k: usize) -> String {
        format!("Request handled {}", "ok ".repeat(5 + k))
    }

    #[test]
    fn test_heuristic_rule() {
        let error = LogRecord::new(LogLevel::Error, "api", "disk full");
        let critical = LogRecord::new(LogLevel::Critical, "db", "down");
        let keyword = LogRecord::new(LogLevel::Info, "api", "request TIMEOUT");
        let normal = LogRecord::new(LogLevel::Warning, "api", "slow response");

        for record in [&error, &critical, &keyword] {
            assert_eq!(heuristic_anomaly(record), AnomalyResult { is_anomaly: true, score: 0.8 });
        }
        assert_eq!(heuristic_anomaly(&normal), AnomalyResult { is_anomaly: false, score: 0.2 });
    }

    #[test]
    fn test_normalize_bounds() {
        assert_eq!(normalize_decision(1e9), 1.0);
        assert_eq!(normalize_decision(-1e9), 0.0);
        assert_eq!(normalize_decision(f64::INFINITY), 1.0);
        assert_eq!(normalize_decision(f64::NEG_INFINITY), 0.0);
        assert_eq!(normalize_decision(f64::NAN), 0.0);
        assert!((normalize_decision(0.5) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(normalize_decision(1.0), 1.0);
    }

    #[test]
    fn test_untrained_uses_heuristic() {
        let dir = tempfile::tempdir().unwrap();
        let scorer = AnomalyScorer::load(FeatureExtractor::default(), dir.path().join("missing.json"));
        assert_eq!(scorer.mode(), ModelMode::Heuristic);

        let result = scorer.detect(&LogRecord::new(LogLevel::Critical, "db", "x"));
        assert_eq!(result, AnomalyResult { is_anomaly: true, score: 0.8 });
    }

    #[test]
    fn test_train_switches_mode() {
        let dir = tempfile::tempdir().unwrap();
        let scorer = scorer(&dir);
        assert!(scorer.train(&normal_records(200)));
        assert_eq!(scorer.mode(), ModelMode::Fitted);
        assert!(scorer.artifact_path().exists());

        let outlier = LogRecord::new(LogLevel::Critical, "payment-service", "x".repeat(400));
        let typical = LogRecord::new(LogLevel::Info, "user-service", request_message(50));
        let outlier_result = scorer.detect(&outlier);
        let typical_result = scorer.detect(&typical);

        assert!(outlier_result.is_anomaly);
        assert!(outlier_result.score > typical_result.score);
        assert!((0.0..=1.0).contains(&typical_result.score));
    }

    #[test]
    fn test_train_empty_fails() {
        let dir = tempfile::tempdir().unwrap();
        let scorer = scorer(&dir);
        assert!(!scorer.train(&[]));
        assert_eq!(scorer.mode(), ModelMode::Heuristic);
    }

    #[test]
    fn test_persisted_model_reloads_identically() {
        let dir = tempfile::tempdir().unwrap();
        let trained = scorer(&dir);
        assert!(trained.train(&normal_records(120)));

        let reloaded = AnomalyScorer::load(FeatureExtractor::default(), trained.artifact_path());
        assert_eq!(reloaded.mode(), ModelMode::Fitted);

        for record in [
            LogRecord::new(LogLevel::Error, "api", "Exception: connection failed"),
            LogRecord::new(LogLevel::Info, "api", request_message(3)),
        ] {
            assert_eq!(trained.detect(&record), reloaded.detect(&record));
        }
    }

    #[test]
    fn test_persistence_failure_keeps_old_model() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the artifact file should be makes the rename fail
        let blocked = dir.path().join("blocked.json");
        std::fs::create_dir_all(blocked.join("child")).unwrap();

        let scorer = AnomalyScorer::new(FeatureExtractor::default(), &blocked);
        assert!(!scorer.train(&normal_records(50)));
        assert_eq!(scorer.mode(), ModelMode::Heuristic);
    }

    #[test]
    fn test_fitted_encoder_failure_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Arc::new(SwitchableEncoder {
            online: AtomicBool::new(true),
        });
        let shared: Arc<dyn TextEncoder> = encoder.clone();
        let scorer = AnomalyScorer::new(
            FeatureExtractor::new(Some(shared)),
            dir.path().join("embedded.json"),
        )
        .with_params(ForestParams {
            num_trees: 20,
            ..Default::default()
        });
        assert!(scorer.train(&normal_records(100)));
        assert_eq!(scorer.mode(), ModelMode::Fitted);

        // A critical record would be anomalous under the heuristic; fitted mode must not fall back to it
        let critical = LogRecord::new(LogLevel::Critical, "db", "Exception: connection failed");
        encoder.online.store(false, Ordering::SeqCst);
        assert_eq!(scorer.detect(&critical), AnomalyResult::degraded());
        assert_eq!(scorer.detect(&critical), AnomalyResult { is_anomaly: false, score: 0.0 });
        assert_eq!(scorer.mode(), ModelMode::Fitted);

        encoder.online.store(true, Ordering::SeqCst);
        let recovered = scorer.detect(&critical);
        assert!((0.0..=1.0).contains(&recovered.score));
        assert!(recovered.score > 0.0);
    }
}
