//! Analysis engine
//!
//! Composes scorer, predictor and summarizer over a window of records.
//! Every stage runs under `catch_unwind`; a stage that fails contributes
//! its neutral value and the remaining stages still run.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::report::{AnomalyListing, BatchReport, RootCauseReport, ScoredRecord, ServicePrediction};
use super::AnalysisError;
use crate::constants::{BATCH_WINDOW, PREDICT_WINDOW, TOP_ANOMALIES};
use crate::logic::backend::{OllamaClient, TextEncoder, TextGenerator};
use crate::logic::config::Settings;
use crate::logic::explain::NarrativeSummarizer;
use crate::logic::features::FeatureExtractor;
use crate::logic::ingest::{LogRecord, RawLogEntry};
use crate::logic::scoring::{AnomalyResult, AnomalyScorer, RiskAssessment, RiskPredictor};
use crate::logic::store::{LogStore, SearchFilters};

pub struct Analyzer {
    scorer: AnomalyScorer,
    predictor: RiskPredictor,
    summarizer: NarrativeSummarizer,
    store: Arc<dyn LogStore>,
}

impl Analyzer {
    pub fn new(
        scorer: AnomalyScorer,
        predictor: RiskPredictor,
        summarizer: NarrativeSummarizer,
        store: Arc<dyn LogStore>,
    ) -> Self {
        Self {
            scorer,
            predictor,
            summarizer,
            store,
        }
    }

    /// Wire backends and load persisted models per settings
    pub fn from_settings(settings: &Settings, store: Arc<dyn LogStore>) -> Self {
        let client = if settings.embeddings_enabled || settings.llm_enabled {
            Some(Arc::new(OllamaClient::new(&settings.ollama)))
        } else {
            None
        };

        let encoder = client
            .as_ref()
            .filter(|_| settings.embeddings_enabled)
            .map(|c| Arc::clone(c) as Arc<dyn TextEncoder>);
        let generator = client
            .as_ref()
            .filter(|_| settings.llm_enabled)
            .map(|c| Arc::clone(c) as Arc<dyn TextGenerator>);

        let extractor = FeatureExtractor::new(encoder);
        let scorer = AnomalyScorer::load(extractor, settings.anomaly_model_path());
        let predictor = RiskPredictor::load(settings.risk_model_path());
        let summarizer = NarrativeSummarizer::new(generator);

        log::info!(
            "Analyzer ready (anomaly={:?}, embeddings={}, risk={:?}, narrative={})",
            scorer.mode(),
            scorer.extractor().has_embeddings(),
            predictor.mode(),
            if summarizer.has_generator() { "llm" } else { "fallback" }
        );

        Self::new(scorer, predictor, summarizer, store)
    }

    pub fn scorer(&self) -> &AnomalyScorer {
        &self.scorer
    }

    pub fn predictor(&self) -> &RiskPredictor {
        &self.predictor
    }

    pub fn store(&self) -> &Arc<dyn LogStore> {
        &self.store
    }

    // ========================================================================
    // WINDOW ANALYSIS
    // ========================================================================

    /// Full pipeline over one window (never fails)
    pub fn analyze_window(&self, records: &[LogRecord]) -> BatchReport {
        let anomalies = self.scan(records);

        let risk = run_stage("risk", || self.predictor.predict(records))
            .unwrap_or_else(|msg| RiskAssessment::unknown(msg));

        let narrative = if anomalies.is_empty() {
            None
        } else {
            let top = top_anomalies(&anomalies, TOP_ANOMALIES);
            run_stage("narrative", || self.summarizer.summarize(&top, "").text).ok()
        };

        log::info!(
            "Analyzed {} records: {} anomalies, risk {} ({:.2})",
            records.len(),
            anomalies.len(),
            risk.prediction.as_str(),
            risk.probability
        );

        BatchReport {
            total_scanned: records.len(),
            anomaly_count: anomalies.len(),
            anomalies,
            risk,
            narrative,
        }
    }

    /// Anomalous records in scan order
    fn scan(&self, records: &[LogRecord]) -> Vec<ScoredRecord> {
        records
            .iter()
            .filter_map(|record| {
                let result = run_stage("anomaly", || self.scorer.detect(record))
                    .unwrap_or_else(|_| AnomalyResult::degraded());
                result.is_anomaly.then(|| ScoredRecord {
                    record: record.clone(),
                    score: result.score,
                })
            })
            .collect()
    }

    // ========================================================================
    // STORE-BACKED ENTRY POINTS
    // ========================================================================

    /// Analyze the newest records in the store
    pub fn batch_analyze(&self) -> Result<BatchReport, AnalysisError> {
        let records = self.store.search(&SearchFilters::all(), BATCH_WINDOW)?;
        Ok(self.analyze_window(&records))
    }

    pub fn detect_anomalies(&self, limit: usize) -> Result<AnomalyListing, AnalysisError> {
        let records = self.store.search(&SearchFilters::all(), limit)?;
        Ok(AnomalyListing {
            total_logs: records.len(),
            anomalies: self.scan(&records),
        })
    }

    /// Stored records matching `filters`, newest first
    pub fn search_logs(&self, filters: &SearchFilters, limit: usize) -> Result<Vec<LogRecord>, AnalysisError> {
        Ok(self.store.search(filters, limit)?)
    }

    /// Risk over the newest records of one service (all services when `None`)
    pub fn predict_service(&self, service: Option<&str>) -> Result<ServicePrediction, AnalysisError> {
        let filters = service.map(SearchFilters::for_service).unwrap_or_default();
        let records = self.store.search(&filters, PREDICT_WINDOW)?;

        let assessment = run_stage("risk", || self.predictor.predict(&records))
            .unwrap_or_else(|msg| RiskAssessment::unknown(msg));

        Ok(ServicePrediction {
            service: service.map(str::to_string),
            assessment,
        })
    }

    /// Narrative over specific records; unknown ids are skipped
    pub fn root_cause(&self, ids: &[String], context: &str) -> Result<RootCauseReport, AnalysisError> {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store.get_by_id(id)? {
                Some(record) => records.push(record),
                None => log::debug!("Log {} not found, skipping", id),
            }
        }

        if records.is_empty() {
            return Err(AnalysisError::NotFound);
        }

        Ok(RootCauseReport {
            logs_analyzed: records.len(),
            analysis: self.summarizer.summarize(&records, context),
        })
    }

    /// Normalize and store one entry
    pub fn ingest(&self, raw: RawLogEntry) -> Result<String, AnalysisError> {
        let id = self.store.index(LogRecord::normalize(raw))?;
        Ok(id)
    }
}

/// Top `n` by descending score; ties keep scan order
fn top_anomalies(anomalies: &[ScoredRecord], n: usize) -> Vec<LogRecord> {
    let mut ranked: Vec<&ScoredRecord> = anomalies.iter().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.into_iter().take(n).map(|s| s.record.clone()).collect()
}

fn run_stage<T>(stage: &str, f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        log::error!("Stage '{}' panicked: {}", stage, message);
        format!("{} stage failed: {}", stage, message)
    })
}
