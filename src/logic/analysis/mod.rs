//! Analysis Module - Pipeline orchestration
//!
//! # Components
//! - `engine.rs`: `Analyzer`, the window pipeline and store-backed entry points
//! - `report.rs`: serializable reports

pub mod engine;
pub mod report;


pub use engine::Analyzer;
pub use report::{AnomalyListing, BatchReport, RootCauseReport, ScoredRecord, ServicePrediction};

use crate::logic::store::StoreError;

#[derive(Debug)]
pub enum AnalysisError {
    Store(StoreError),
    /// None of the requested logs exist
    NotFound,
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisError::Store(e) => write!(f, "Log store failure: {}", e),
            AnalysisError::NotFound => write!(f, "No logs found"),
        }
    }
}

impl std::error::Error for AnalysisError {}

impl From<StoreError> for AnalysisError {
    fn from(err: StoreError) -> Self {
        AnalysisError::Store(err)
    }
}
