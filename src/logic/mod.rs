//! Logic Module - Business Logic & Engines
//!
//! ## Architecture
//! - `ingest/` - Raw entry normalization
//! - `features/` - Feature extraction (anomaly + risk layouts)
//! - `model/` - Isolation forest, gradient-boosted trees, artifacts
//! - `scoring/` - Dual-mode anomaly scorer and risk predictor
//! - `explain/` - Root-cause narratives
//! - `response/` - Alert channels and dispatch
//! - `store/` - Log storage and search
//! - `analysis/` - Pipeline orchestration

pub mod config;

// External collaborators
pub mod backend;
pub mod store;

// Pipeline
pub mod ingest;
pub mod features;
pub mod model;
pub mod scoring;
pub mod explain;
pub mod response;
pub mod analysis;
