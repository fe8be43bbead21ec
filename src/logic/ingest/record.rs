//! Log record types

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::preprocess::{clean_message, extract_fields, normalize_timestamp, ExtractedFields};

// ============================================================================
// LEVEL
// ============================================================================

/// Log severity level
///
/// Unknown input maps to `Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "DEBUG" => LogLevel::Debug,
            "INFO" => LogLevel::Info,
            "WARNING" => LogLevel::Warning,
            "ERROR" => LogLevel::Error,
            "CRITICAL" => LogLevel::Critical,
            _ => LogLevel::Info,
        }
    }

    /// Fixed ordinal used in anomaly features (DEBUG=0 … CRITICAL=4)
    pub fn ordinal(self) -> u8 {
        match self {
            LogLevel::Debug => 0,
            LogLevel::Info => 1,
            LogLevel::Warning => 2,
            LogLevel::Error => 3,
            LogLevel::Critical => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// ERROR or CRITICAL
    pub fn is_error(self) -> bool {
        matches!(self, LogLevel::Error | LogLevel::Critical)
    }
}

impl From<String> for LogLevel {
    fn from(raw: String) -> Self {
        LogLevel::parse(&raw)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RAW INPUT
// ============================================================================

/// Log entry as submitted, before normalization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLogEntry {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub level: String,
    #[serde(default = "unknown_service")]
    pub service: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

fn unknown_service() -> String {
    "unknown".to_string()
}

// ============================================================================
// NORMALIZED RECORD
// ============================================================================

/// Normalized log record
///
/// Produced once at ingestion; nothing in the pipeline mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Store-assigned id (absent until indexed)
    #[serde(default, rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// ISO-8601, no offset
    pub timestamp: String,
    pub level: LogLevel,
    pub service: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub extracted_fields: ExtractedFields,
}

impl LogRecord {
    /// Normalize a raw entry
    pub fn normalize(raw: RawLogEntry) -> Self {
        let timestamp = match raw.timestamp.as_deref() {
            Some(ts) if !ts.trim().is_empty() => normalize_timestamp(ts),
            _ => now_iso(),
        };
        let message = clean_message(&raw.message);
        let extracted_fields = extract_fields(&message);

        Self {
            id: None,
            timestamp,
            level: LogLevel::parse(&raw.level),
            service: raw.service,
            message,
            metadata: raw.metadata,
            extracted_fields,
        }
    }

    /// Record stamped with the current time
    pub fn new(level: LogLevel, service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::normalize(RawLogEntry {
            timestamp: None,
            level: level.as_str().to_string(),
            service: service.into(),
            message: message.into(),
            metadata: None,
        })
    }

    /// Same record with an explicit timestamp (normalized)
    pub fn at(mut self, timestamp: &str) -> Self {
        self.timestamp = normalize_timestamp(timestamp);
        self
    }

    /// Copy carrying the id assigned by a store
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Message length in characters
    pub fn message_length(&self) -> usize {
        self.message.chars().count()
    }
}

pub(crate) fn now_iso() -> String {
    Utc::now()
        .naive_utc()
        .format("%Y-%m-%dT%H:%M:%S%.f")
        .to_string()
}
