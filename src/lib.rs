//! DevOps Monitor Core
//!
//! Log ingestion, per-record anomaly scoring, batch failure-risk
//! prediction, root-cause narratives and multi-channel alerting.

pub mod constants;
pub mod logic;
