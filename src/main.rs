//! DevOps Monitor - command line driver

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use devops_monitor_core::constants::{APP_NAME, APP_VERSION, DEFAULT_SEARCH_LIMIT};
use devops_monitor_core::logic::analysis::Analyzer;
use devops_monitor_core::logic::config::Settings;
use devops_monitor_core::logic::features::risk_training_matrix;
use devops_monitor_core::logic::ingest::{self, LogLevel, LogRecord, RawLogEntry};
use devops_monitor_core::logic::response::{Alert, AlertDispatcher, DispatchResult};
use devops_monitor_core::logic::scoring::{RiskAssessment, RiskLabel};
use devops_monitor_core::logic::store::{LogStore, MemoryLogStore, SearchFilters, SqliteLogStore};

#[derive(Parser, Debug)]
#[command(name = "devops-monitor")]
#[command(version)]
#[command(about = "Score logs for anomalies and failure risk, explain and alert", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a JSON-lines file of log entries
    Analyze {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Send a failure alert when risk is medium or high
        #[arg(long)]
        alert: bool,
    },
    /// Store a JSON-lines file in the log database
    Ingest {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Analyze the newest stored logs
    Batch {
        #[arg(long)]
        alert: bool,
    },
    /// Search stored logs, newest first
    Logs {
        /// Case-insensitive message substring
        #[arg(long)]
        query: Option<String>,
        #[arg(long, value_parser = ["debug", "info", "warning", "error", "critical"], ignore_case = true)]
        level: Option<String>,
        #[arg(long)]
        service: Option<String>,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
    /// List anomalies among the newest stored logs
    Anomalies {
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
        /// Send one anomaly alert per flagged log
        #[arg(long)]
        alert: bool,
    },
    /// Failure risk for one service (all services when omitted)
    Predict {
        #[arg(long)]
        service: Option<String>,
    },
    /// Root-cause narrative for stored logs
    Rca {
        #[arg(value_name = "ID", required = true)]
        ids: Vec<String>,
        #[arg(long, default_value = "")]
        context: String,
    },
    /// Fit the anomaly model on a JSON-lines file of normal traffic
    TrainAnomaly {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Fit the risk model on labeled batches (`{"label":0|1,"logs":[...]}` per line)
    TrainRisk {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Send a test alert through every configured channel
    AlertTest,
}

/// One line of a risk training file
#[derive(Debug, Deserialize)]
struct LabeledBatch {
    label: u8,
    logs: Vec<RawLogEntry>,
}

#[derive(Serialize)]
struct TrainOutcome<'a> {
    model: &'a str,
    samples: usize,
    trained: bool,
}

fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    log::info!("Starting {} v{}", APP_NAME, APP_VERSION);

    let settings = Settings::from_env();
    if let Err(e) = run(cli.command, &settings) {
        log::error!("{}", e);
        process::exit(1);
    }
}

fn run(command: Command, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Analyze { file, alert } => {
            let records = ingest::read_jsonl(&file)?;
            let analyzer = Analyzer::from_settings(settings, Arc::new(MemoryLogStore::new()));
            let report = analyzer.analyze_window(&records);
            print_json(&report)?;
            if alert {
                alert_on_risk(settings, &report.risk, &service_of(&records));
            }
        }
        Command::Ingest { file } => {
            let records = ingest::read_jsonl(&file)?;
            let store = open_store(settings)?;
            let ids = records
                .into_iter()
                .map(|r| store.index(r))
                .collect::<Result<Vec<_>, _>>()?;
            log::info!("Indexed {} records into {}", ids.len(), settings.log_db_path.display());
            print_json(&ids)?;
        }
        Command::Batch { alert } => {
            let analyzer = Analyzer::from_settings(settings, open_store(settings)?);
            let report = analyzer.batch_analyze()?;
            print_json(&report)?;
            if alert {
                alert_on_risk(settings, &report.risk, "all-services");
            }
        }
        Command::Logs {
            query,
            level,
            service,
            limit,
        } => {
            let mut filters = service.as_deref().map(SearchFilters::for_service).unwrap_or_default();
            if let Some(ref query) = query {
                filters = filters.with_query(query);
            }
            if let Some(ref level) = level {
                filters = filters.with_level(LogLevel::parse(level));
            }
            let analyzer = Analyzer::from_settings(settings, open_store(settings)?);
            print_json(&analyzer.search_logs(&filters, limit)?)?;
        }
        Command::Anomalies { limit, alert } => {
            let analyzer = Analyzer::from_settings(settings, open_store(settings)?);
            let listing = analyzer.detect_anomalies(limit)?;
            log::info!("{} anomalies among {} logs", listing.anomalies_detected(), listing.total_logs);
            print_json(&listing)?;
            if alert {
                let dispatcher = AlertDispatcher::from_settings(settings);
                for anomaly_alert in listing.alerts() {
                    log_delivery(&dispatcher.dispatch(&anomaly_alert.now()));
                }
            }
        }
        Command::Predict { service } => {
            let analyzer = Analyzer::from_settings(settings, open_store(settings)?);
            print_json(&analyzer.predict_service(service.as_deref())?)?;
        }
        Command::Rca { ids, context } => {
            let analyzer = Analyzer::from_settings(settings, open_store(settings)?);
            print_json(&analyzer.root_cause(&ids, &context)?)?;
        }
        Command::TrainAnomaly { file } => {
            let records = ingest::read_jsonl(&file)?;
            let analyzer = Analyzer::from_settings(settings, Arc::new(MemoryLogStore::new()));
            let trained = analyzer.scorer().train(&records);
            print_json(&TrainOutcome {
                model: "anomaly",
                samples: records.len(),
                trained,
            })?;
        }
        Command::TrainRisk { file } => {
            let (batches, labels) = read_labeled_batches(&file)?;
            let matrix = risk_training_matrix(&batches)?;
            let labels = Array1::from(labels);
            let analyzer = Analyzer::from_settings(settings, Arc::new(MemoryLogStore::new()));
            let trained = analyzer.predictor().train(matrix.view(), labels.view());
            print_json(&TrainOutcome {
                model: "risk",
                samples: batches.len(),
                trained,
            })?;
        }
        Command::AlertTest => {
            let result = AlertDispatcher::from_settings(settings).dispatch(&Alert::test().now());
            print_json(&result)?;
        }
    }

    Ok(())
}

fn open_store(settings: &Settings) -> Result<Arc<dyn LogStore>, Box<dyn std::error::Error>> {
    Ok(Arc::new(SqliteLogStore::open(&settings.log_db_path)?))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Single service name when the window holds one, else a generic label
fn service_of(records: &[LogRecord]) -> String {
    match records.first() {
        Some(first) if records.iter().all(|r| r.service == first.service) => first.service.clone(),
        _ => "all-services".to_string(),
    }
}

fn alert_on_risk(settings: &Settings, risk: &RiskAssessment, service: &str) -> Option<DispatchResult> {
    if !matches!(risk.prediction, RiskLabel::MediumRisk | RiskLabel::HighRisk) {
        log::info!("Risk is {}, no alert sent", risk.prediction.as_str());
        return None;
    }

    let alert = Alert::failure_prediction(service, risk.probability).now();
    let result = AlertDispatcher::from_settings(settings).dispatch(&alert);
    log_delivery(&result);
    Some(result)
}

fn log_delivery(result: &DispatchResult) {
    for (channel, delivered) in result.channels() {
        log::info!("Alert via {}: {}", channel, if delivered { "sent" } else { "not sent" });
    }
}

fn read_labeled_batches(path: &Path) -> Result<(Vec<Vec<LogRecord>>, Vec<f64>), Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let mut batches = Vec::new();
    let mut labels = Vec::new();

    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let batch: LabeledBatch = serde_json::from_str(line)
            .map_err(|e| format!("Invalid training batch on line {}: {}", i + 1, e))?;
        labels.push(f64::from(batch.label));
        batches.push(batch.logs.into_iter().map(LogRecord::normalize).collect());
    }

    Ok((batches, labels))
}
