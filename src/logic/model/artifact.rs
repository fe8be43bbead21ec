//! Model Artifacts - versioned, checksummed persistence
//!
//! A fitted model is stored as a JSON envelope recording the feature
//! layout it was fitted against and a SHA-256 of the model body.
//!
//! # Failure Strategy
//! Missing, corrupt, foreign or layout-mismatched artifacts are rejected
//! on load; the caller then runs its heuristic.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{GradientBoostedTrees, IsolationForest};
use crate::logic::features::{LayoutMismatchError, LayoutSignature};

/// Model types that can be stored as artifacts
pub trait ArtifactModel: Serialize + DeserializeOwned {
    const KIND: &'static str;
}

impl ArtifactModel for IsolationForest {
    const KIND: &'static str = "isolation_forest";
}

impl ArtifactModel for GradientBoostedTrees {
    const KIND: &'static str = "gradient_boosted_trees";
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub enum ArtifactError {
    NotFound(PathBuf),
    IoError(std::io::Error),
    SerializationError(serde_json::Error),
    KindMismatch { expected: String, actual: String },
    ChecksumMismatch,
    Layout(LayoutMismatchError),
}

impl std::fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactError::NotFound(path) => write!(f, "Artifact not found: {}", path.display()),
            ArtifactError::IoError(e) => write!(f, "IO Error: {}", e),
            ArtifactError::SerializationError(e) => write!(f, "Serialization Error: {}", e),
            ArtifactError::KindMismatch { expected, actual } => {
                write!(f, "Artifact kind mismatch: expected {}, got {}", expected, actual)
            }
            ArtifactError::ChecksumMismatch => write!(f, "Artifact checksum mismatch"),
            ArtifactError::Layout(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ArtifactError {}

impl From<std::io::Error> for ArtifactError {
    fn from(err: std::io::Error) -> Self {
        ArtifactError::IoError(err)
    }
}

impl From<serde_json::Error> for ArtifactError {
    fn from(err: serde_json::Error) -> Self {
        ArtifactError::SerializationError(err)
    }
}

impl From<LayoutMismatchError> for ArtifactError {
    fn from(err: LayoutMismatchError) -> Self {
        ArtifactError::Layout(err)
    }
}

// ============================================================================
// ENVELOPE
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact<M> {
    pub kind: String,
    pub layout: LayoutSignature,
    pub trained_at: DateTime<Utc>,
    /// Training rows
    pub samples: usize,
    /// SHA-256 (hex) of the serialized model
    pub checksum: String,
    pub model: M,
}

impl<M: ArtifactModel> ModelArtifact<M> {
    pub fn new(model: M, layout: LayoutSignature, samples: usize) -> Result<Self, ArtifactError> {
        let checksum = model_checksum(&model)?;
        Ok(Self {
            kind: M::KIND.to_string(),
            layout,
            trained_at: Utc::now(),
            samples,
            checksum,
            model,
        })
    }

    /// Write via temp file + rename
    pub fn save(&self, path: &Path) -> Result<(), ArtifactError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec_pretty(self)?;
        let tmp = temp_path(path);
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        log::info!(
            "Saved {} artifact ({} samples, layout {:08x}) to {}",
            self.kind,
            self.samples,
            self.layout.hash,
            path.display()
        );
        Ok(())
    }

    /// Load and validate against the running layout
    pub fn load(path: &Path, expected: &LayoutSignature) -> Result<Self, ArtifactError> {
        if !path.exists() {
            return Err(ArtifactError::NotFound(path.to_path_buf()));
        }

        let data = fs::read(path)?;
        let artifact: Self = serde_json::from_slice(&data)?;

        if artifact.kind != M::KIND {
            return Err(ArtifactError::KindMismatch {
                expected: M::KIND.to_string(),
                actual: artifact.kind,
            });
        }
        if model_checksum(&artifact.model)? != artifact.checksum {
            return Err(ArtifactError::ChecksumMismatch);
        }
        expected.validate(&artifact.layout)?;

        Ok(artifact)
    }
}

fn model_checksum<M: Serialize>(model: &M) -> Result<String, ArtifactError> {
    let bytes = serde_json::to_vec(model)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
