//! Feature extraction tests across extractor, layout and vector

use std::sync::Arc;

use crate::logic::backend::{BackendError, TextEncoder};
use crate::logic::features::{
    contains_error_keyword, extract_risk_features, feature_matrix, risk_training_matrix,
    FeatureError, FeatureExtractor, LayoutSignature, RISK_FEATURE_COUNT,
};
use crate::logic::ingest::{LogLevel, LogRecord};

/// Encoder returning `[len, 0.5, ...]` of a fixed dimension
struct FakeEncoder {
    dim: usize,
    fail: bool,
}

impl TextEncoder for FakeEncoder {
    fn id(&self) -> &str {
        "fake"
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn encode(&self, text: &str) -> Result<Vec<f64>, BackendError> {
        if self.fail {
            return Err(BackendError::Unavailable("down".into()));
        }
        let mut v = vec![0.5; self.dim];
        v[0] = text.len() as f64;
        Ok(v)
    }
}

fn record(level: LogLevel, service: &str, message: &str) -> LogRecord {
    LogRecord::new(level, service, message)
}

#[test]
fn test_fallback_anomaly_features() {
    let extractor = FeatureExtractor::default();
    assert!(!extractor.has_embeddings());

    let error = extractor
        .extract_anomaly_features(&record(LogLevel::Error, "api", "disk full"))
        .unwrap();
    assert_eq!(error.values, vec![9.0, 1.0, 0.0]);

    let critical = extractor
        .extract_anomaly_features(&record(LogLevel::Critical, "api", "down"))
        .unwrap();
    assert_eq!(critical.values, vec![4.0, 0.0, 1.0]);

    let info = extractor
        .extract_anomaly_features(&record(LogLevel::Info, "api", "ok"))
        .unwrap();
    assert_eq!(info.values, vec![2.0, 0.0, 0.0]);
    assert_eq!(info.layout_hash, LayoutSignature::anomaly_fallback().hash);
}

#[test]
fn test_embedding_anomaly_features() {
    let extractor = FeatureExtractor::new(Some(Arc::new(FakeEncoder { dim: 4, fail: false })));
    let vector = extractor
        .extract_anomaly_features(&record(LogLevel::Warning, "api", "slow"))
        .unwrap();

    assert_eq!(vector.len(), 4 + 2);
    assert_eq!(vector.values[4], 2.0); // WARNING ordinal
    assert_eq!(vector.values[5], 4.0); // message length
    assert_eq!(vector.layout_hash, extractor.anomaly_layout().hash);
}

#[test]
fn test_embedding_failure_is_reported() {
    let extractor = FeatureExtractor::new(Some(Arc::new(FakeEncoder { dim: 4, fail: true })));
    let result = extractor.extract_anomaly_features(&record(LogLevel::Info, "api", "x"));
    assert!(matches!(result, Err(FeatureError::Embedding(_))));
}

#[test]
fn test_risk_features_empty() {
    let features = extract_risk_features(&[]);
    assert_eq!(features.as_array(), [0.0; RISK_FEATURE_COUNT]);
}

#[test]
fn test_risk_features_batch() {
    let records = vec![
        record(LogLevel::Info, "user-service", "User logged in"),
        record(LogLevel::Warning, "user-service", "Request timeout, retrying"),
        record(LogLevel::Error, "payment-service", "Payment FAILED"),
        record(LogLevel::Critical, "database", "Crash detected"),
    ];
    let features = extract_risk_features(&records);

    assert_eq!(features.total_count, 4.0);
    assert_eq!(features.error_count, 2.0);
    assert_eq!(features.warning_count, 1.0);
    assert_eq!(features.error_rate, 0.5);
    assert_eq!(features.warning_rate, 0.25);
    assert_eq!(features.keyword_count, 3.0);
    assert_eq!(features.keyword_rate, 0.75);
    assert_eq!(features.service_count, 3.0);
    assert_eq!(features.temporal_reserved, 1.0);

    let expected_avg = (14.0 + 25.0 + 14.0 + 14.0) / 4.0;
    assert!((features.avg_message_length - expected_avg).abs() < 1e-9);
}

#[test]
fn test_keywords_case_insensitive() {
    assert!(contains_error_keyword("NullPointerException thrown"));
    assert!(contains_error_keyword("connection TIMEOUT"));
    assert!(!contains_error_keyword("all good"));
}

#[test]
fn test_feature_matrix() {
    let extractor = FeatureExtractor::default();
    let records = vec![
        record(LogLevel::Info, "a", "one"),
        record(LogLevel::Error, "a", "three"),
    ];
    let matrix = extractor.anomaly_matrix(&records).unwrap();
    assert_eq!(matrix.shape(), &[2, 3]);
    assert_eq!(matrix[[1, 0]], 5.0);
    assert_eq!(matrix[[1, 1]], 1.0);
}

#[test]
fn test_feature_matrix_rejects_unequal_lengths() {
    let fallback = FeatureExtractor::default()
        .extract_anomaly_features(&record(LogLevel::Info, "a", "x"))
        .unwrap();
    let risk = extract_risk_features(&[record(LogLevel::Info, "a", "x")]).to_vector();

    let result = feature_matrix(&[fallback, risk]);
    assert!(matches!(result, Err(FeatureError::DimensionMismatch { expected: 3, actual: 10 })));
    assert!(matches!(feature_matrix(&[]), Err(FeatureError::EmptyInput)));
}

#[test]
fn test_risk_training_matrix() {
    let batches = vec![
        vec![record(LogLevel::Info, "a", "fine")],
        vec![record(LogLevel::Error, "b", "failed"), record(LogLevel::Info, "b", "ok")],
    ];
    let matrix = risk_training_matrix(&batches).unwrap();
    assert_eq!(matrix.shape(), &[2, RISK_FEATURE_COUNT]);
    assert_eq!(matrix[[1, 3]], 0.5);
}
