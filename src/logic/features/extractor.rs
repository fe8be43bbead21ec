//! Feature extraction from log records

use std::collections::HashSet;
use std::sync::Arc;

use ndarray::Array2;

use super::layout::{LayoutSignature, RISK_FEATURE_COUNT};
use super::vector::{FeatureVector, RiskFeatures};
use super::FeatureError;
use crate::constants::ERROR_KEYWORDS;
use crate::logic::backend::TextEncoder;
use crate::logic::ingest::{LogLevel, LogRecord};

/// Case-insensitive substring match against the fixed keyword list
pub fn contains_error_keyword(message: &str) -> bool {
    let lower = message.to_lowercase();
    ERROR_KEYWORDS.iter().any(|k| lower.contains(k))
}

// ============================================================================
// ANOMALY FEATURES
// ============================================================================

/// Per-record feature extractor
///
/// With an encoder: `[embedding..., level_ordinal, message_length]`.
/// Without: `[message_length, is_error, is_critical]`.
#[derive(Clone, Default)]
pub struct FeatureExtractor {
    encoder: Option<Arc<dyn TextEncoder>>,
}

impl FeatureExtractor {
    pub fn new(encoder: Option<Arc<dyn TextEncoder>>) -> Self {
        Self { encoder }
    }

    pub fn has_embeddings(&self) -> bool {
        self.encoder.is_some()
    }

    /// Layout produced by `extract_anomaly_features`
    pub fn anomaly_layout(&self) -> LayoutSignature {
        match &self.encoder {
            Some(encoder) => LayoutSignature::anomaly_embedding(encoder.id(), encoder.dimension()),
            None => LayoutSignature::anomaly_fallback(),
        }
    }

    pub fn extract_anomaly_features(&self, record: &LogRecord) -> Result<FeatureVector, FeatureError> {
        let message_length = record.message_length() as f64;

        let Some(encoder) = &self.encoder else {
            let values = vec![
                message_length,
                flag(record.level == LogLevel::Error),
                flag(record.level == LogLevel::Critical),
            ];
            return Ok(FeatureVector::new(&LayoutSignature::anomaly_fallback(), values));
        };

        let mut values = encoder.encode(&record.message)?;
        if values.len() != encoder.dimension() {
            return Err(FeatureError::DimensionMismatch {
                expected: encoder.dimension(),
                actual: values.len(),
            });
        }
        values.push(record.level.ordinal() as f64);
        values.push(message_length);

        Ok(FeatureVector::new(&self.anomaly_layout(), values))
    }

    /// Stacked anomaly features of a training batch
    pub fn anomaly_matrix(&self, records: &[LogRecord]) -> Result<Array2<f64>, FeatureError> {
        let vectors = records
            .iter()
            .map(|r| self.extract_anomaly_features(r))
            .collect::<Result<Vec<_>, _>>()?;
        feature_matrix(&vectors)
    }
}

impl std::fmt::Debug for FeatureExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureExtractor")
            .field("encoder", &self.encoder.as_ref().map(|e| e.id().to_string()))
            .finish()
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

// ============================================================================
// RISK FEATURES
// ============================================================================

/// Batch-level risk features; an empty batch yields all zeros
pub fn extract_risk_features(records: &[LogRecord]) -> RiskFeatures {
    if records.is_empty() {
        return RiskFeatures::default();
    }

    let total = records.len() as f64;
    let error_count = records.iter().filter(|r| r.level.is_error()).count() as f64;
    let warning_count = records
        .iter()
        .filter(|r| r.level == LogLevel::Warning)
        .count() as f64;
    let keyword_count = records
        .iter()
        .filter(|r| contains_error_keyword(&r.message))
        .count() as f64;
    let total_length: usize = records.iter().map(LogRecord::message_length).sum();
    let services: HashSet<&str> = records.iter().map(|r| r.service.as_str()).collect();

    RiskFeatures {
        total_count: total,
        error_count,
        warning_count,
        error_rate: error_count / total.max(1.0),
        warning_rate: warning_count / total.max(1.0),
        avg_message_length: total_length as f64 / total,
        keyword_count,
        keyword_rate: keyword_count / total.max(1.0),
        service_count: services.len() as f64,
        temporal_reserved: 1.0,
    }
}

// ============================================================================
// MATRIX
// ============================================================================

/// Stack vectors of one layout into a row matrix
pub fn feature_matrix(vectors: &[FeatureVector]) -> Result<Array2<f64>, FeatureError> {
    let first = vectors.first().ok_or(FeatureError::EmptyInput)?;
    let cols = first.len();

    let mut flat = Vec::with_capacity(vectors.len() * cols);
    for vector in vectors {
        if vector.len() != cols {
            return Err(FeatureError::DimensionMismatch {
                expected: cols,
                actual: vector.len(),
            });
        }
        if vector.layout_hash != first.layout_hash {
            return Err(FeatureError::MixedLayouts);
        }
        flat.extend_from_slice(vector.as_slice());
    }

    Array2::from_shape_vec((vectors.len(), cols), flat)
        .map_err(|e| FeatureError::Shape(e.to_string()))
}

/// Risk rows for offline training, one per batch
pub fn risk_training_matrix(batches: &[Vec<LogRecord>]) -> Result<Array2<f64>, FeatureError> {
    let vectors: Vec<FeatureVector> = batches
        .iter()
        .map(|batch| extract_risk_features(batch).to_vector())
        .collect();
    let matrix = feature_matrix(&vectors)?;
    debug_assert_eq!(matrix.ncols(), RISK_FEATURE_COUNT);
    Ok(matrix)
}
