//! Feature Vector - Core data structure for model input
//!
//! Every vector carries the version and hash of the layout it was built
//! with, so vectors from different layouts are never mixed silently.

use serde::{Deserialize, Serialize};

use super::layout::{LayoutSignature, RISK_FEATURE_COUNT};

// ============================================================================
// VERSIONED FEATURE VECTOR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub version: u8,
    pub layout_hash: u32,
    pub values: Vec<f64>,
}

impl FeatureVector {
    pub fn new(layout: &LayoutSignature, values: Vec<f64>) -> Self {
        Self {
            version: layout.version,
            layout_hash: layout.hash,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

// ============================================================================
// RISK FEATURES
// ============================================================================

/// Named view of the 10-dim risk vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskFeatures {
    pub total_count: f64,
    pub error_count: f64,
    pub warning_count: f64,
    pub error_rate: f64,
    pub warning_rate: f64,
    pub avg_message_length: f64,
    pub keyword_count: f64,
    pub keyword_rate: f64,
    pub service_count: f64,
    pub temporal_reserved: f64,
}

impl RiskFeatures {
    /// Values in RISK_FEATURE_LAYOUT order
    pub fn as_array(&self) -> [f64; RISK_FEATURE_COUNT] {
        [
            self.total_count,
            self.error_count,
            self.warning_count,
            self.error_rate,
            self.warning_rate,
            self.avg_message_length,
            self.keyword_count,
            self.keyword_rate,
            self.service_count,
            self.temporal_reserved,
        ]
    }

    pub fn to_vector(&self) -> FeatureVector {
        FeatureVector::new(&LayoutSignature::risk(), self.as_array().to_vec())
    }

    pub fn summary(&self) -> FeatureSummary {
        FeatureSummary {
            total_logs: self.total_count as usize,
            error_count: self.error_count as usize,
            error_rate: self.error_rate,
        }
    }

}

/// Short summary reported alongside a risk assessment
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub total_logs: usize,
    pub error_count: usize,
    pub error_rate: f64,
}
