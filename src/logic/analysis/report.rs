//! Analysis report types

use serde::{Deserialize, Serialize};

use crate::logic::explain::Narrative;
use crate::logic::ingest::LogRecord;
use crate::logic::response::Alert;
use crate::logic::scoring::RiskAssessment;

/// Record flagged as anomalous, with its score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    #[serde(rename = "log")]
    pub record: LogRecord,
    #[serde(rename = "anomaly_score")]
    pub score: f64,
}

/// Result of one window analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub total_scanned: usize,
    pub anomaly_count: usize,
    /// Scan order
    pub anomalies: Vec<ScoredRecord>,
    pub risk: RiskAssessment,
    /// Absent when no anomalies were found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}

/// Result of `Analyzer::detect_anomalies`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyListing {
    pub total_logs: usize,
    pub anomalies: Vec<ScoredRecord>,
}

impl AnomalyListing {
    pub fn anomalies_detected(&self) -> usize {
        self.anomalies.len()
    }

    /// One warning per anomaly, naming the stored log id
    pub fn alerts(&self) -> Vec<Alert> {
        self.anomalies
            .iter()
            .map(|scored| {
                let id = scored.record.id.as_deref().unwrap_or("unindexed");
                Alert::anomaly(id, scored.score).with_service(&scored.record.service)
            })
            .collect()
    }
}

/// Result of `Analyzer::predict_service`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePrediction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(flatten)]
    pub assessment: RiskAssessment,
}

/// Result of `Analyzer::root_cause`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCauseReport {
    pub logs_analyzed: usize,
    pub analysis: Narrative,
}
