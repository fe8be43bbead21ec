//! Feature Layout - Centralized Feature Definition
//!
//! **This file controls the feature schema of both scoring paths**
//!
//! ## Rules:
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove feature → increment FEATURE_VERSION
//!
//! Every persisted model artifact records the `LayoutSignature` it was
//! fitted against. Loading an artifact with a different signature fails.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// RISK LAYOUT (per batch)
// ============================================================================

pub const RISK_FEATURE_LAYOUT: &[&str] = &[
    "total_count",        // 0
    "error_count",        // 1: ERROR + CRITICAL
    "warning_count",      // 2
    "error_rate",         // 3
    "warning_rate",       // 4
    "avg_message_length", // 5: characters
    "keyword_count",      // 6
    "keyword_rate",       // 7
    "service_count",      // 8: distinct services
    "temporal_reserved",  // 9: constant 1.0
];

/// Must match RISK_FEATURE_LAYOUT.len()
pub const RISK_FEATURE_COUNT: usize = 10;

// ============================================================================
// ANOMALY LAYOUTS (per record)
// ============================================================================

/// Used when no embedding backend is available
pub const ANOMALY_FALLBACK_LAYOUT: &[&str] = &["message_length", "is_error", "is_critical"];

/// Appended after the embedding values
pub const ANOMALY_EMBEDDING_TAIL: &[&str] = &["level_ordinal", "message_length"];

// ============================================================================
// LAYOUT SIGNATURE
// ============================================================================

/// Identity of a feature layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSignature {
    pub name: String,
    pub version: u8,
    /// CRC32 over version, name and feature names
    pub hash: u32,
    pub feature_count: usize,
}

impl LayoutSignature {
    pub fn risk() -> Self {
        Self::build("risk", RISK_FEATURE_LAYOUT.iter().copied(), RISK_FEATURE_COUNT)
    }

    pub fn anomaly_fallback() -> Self {
        Self::build(
            "anomaly_fallback",
            ANOMALY_FALLBACK_LAYOUT.iter().copied(),
            ANOMALY_FALLBACK_LAYOUT.len(),
        )
    }

    /// Embedding layout; the encoder id and dimension are part of the hash
    pub fn anomaly_embedding(encoder_id: &str, dimension: usize) -> Self {
        let name = format!("anomaly_embedding:{}:{}", encoder_id, dimension);
        let count = dimension + ANOMALY_EMBEDDING_TAIL.len();
        Self::build(&name, ANOMALY_EMBEDDING_TAIL.iter().copied(), count)
    }

    fn build<'a>(name: &str, features: impl Iterator<Item = &'a str>, feature_count: usize) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(&[FEATURE_VERSION]);
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
        for feature in features {
            hasher.update(feature.as_bytes());
            hasher.update(&[0]);
        }
        hasher.update(&(feature_count as u64).to_le_bytes());

        Self {
            name: name.to_string(),
            version: FEATURE_VERSION,
            hash: hasher.finalize(),
            feature_count,
        }
    }

    /// Validate that `incoming` was produced with this layout
    pub fn validate(&self, incoming: &LayoutSignature) -> Result<(), LayoutMismatchError> {
        if incoming.version != self.version
            || incoming.hash != self.hash
            || incoming.feature_count != self.feature_count
        {
            return Err(LayoutMismatchError {
                expected_version: self.version,
                expected_hash: self.hash,
                actual_version: incoming.version,
                actual_hash: incoming.hash,
            });
        }
        Ok(())
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct LayoutMismatchError {
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

impl std::fmt::Display for LayoutMismatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Feature layout mismatch: expected v{} (hash: {:08x}), got v{} (hash: {:08x})",
            self.expected_version, self.expected_hash, self.actual_version, self.actual_hash
        )
    }
}

impl std::error::Error for LayoutMismatchError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_count() {
        assert_eq!(RISK_FEATURE_LAYOUT.len(), RISK_FEATURE_COUNT);
        assert_eq!(LayoutSignature::risk().feature_count, 10);
    }

    #[test]
    fn test_hash_stable() {
        assert_eq!(LayoutSignature::risk(), LayoutSignature::risk());
        assert_ne!(LayoutSignature::risk().hash, 0);
    }

    #[test]
    fn test_layouts_distinct() {
        let risk = LayoutSignature::risk();
        let fallback = LayoutSignature::anomaly_fallback();
        let minilm = LayoutSignature::anomaly_embedding("all-minilm", 384);
        let other = LayoutSignature::anomaly_embedding("nomic-embed-text", 384);

        assert_ne!(risk.hash, fallback.hash);
        assert_ne!(minilm.hash, other.hash);
        assert_eq!(fallback.feature_count, 3);
        assert_eq!(minilm.feature_count, 386);
    }

    #[test]
    fn test_validate() {
        let current = LayoutSignature::anomaly_fallback();
        assert!(current.validate(&LayoutSignature::anomaly_fallback()).is_ok());

        let mut stale = current.clone();
        stale.hash ^= 1;
        assert!(current.validate(&stale).is_err());

        let mut older = current.clone();
        older.version = FEATURE_VERSION + 1;
        assert!(current.validate(&older).is_err());
    }
}
