//! Ingestion preprocessing
//!
//! Timestamp normalization, message cleanup and field extraction.

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// ============================================================================
// PATTERNS
// ============================================================================

static ANSI_CODES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("ansi regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static IP_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("ip regex"));
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s]+").expect("url regex"));
static HTTP_STATUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[4-5]\d{2}\b").expect("status regex"));
static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*(ms|sec|seconds?|minutes?)").expect("duration regex")
});

/// Accepted input formats, tried in order after RFC 3339
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%b/%Y:%H:%M:%S",
];

const OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

// ============================================================================
// TIMESTAMP
// ============================================================================

/// Normalize a timestamp to ISO-8601 (UTC, no offset)
///
/// Unparseable input is returned unchanged.
pub fn normalize_timestamp(raw: &str) -> String {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt
            .with_timezone(&Utc)
            .naive_utc()
            .format(OUTPUT_FORMAT)
            .to_string();
    }

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.format(OUTPUT_FORMAT).to_string())
        .unwrap_or_else(|| raw.to_string())
}

// ============================================================================
// MESSAGE
// ============================================================================

/// Strip ANSI colour codes, collapse whitespace, trim
pub fn clean_message(message: &str) -> String {
    let stripped = ANSI_CODES.replace_all(message, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

// ============================================================================
// FIELD EXTRACTION
// ============================================================================

/// Structured fields pulled out of a message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub http_status_codes: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_stacktrace: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub durations: Vec<String>,
}

impl ExtractedFields {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub fn extract_fields(message: &str) -> ExtractedFields {
    let collect = |re: &Regex| -> Vec<String> {
        re.find_iter(message).map(|m| m.as_str().to_string()).collect()
    };

    let lower = message.to_lowercase();
    let durations = DURATION
        .captures_iter(&lower)
        .map(|c| format!("{}{}", &c[1], &c[2]))
        .collect();

    ExtractedFields {
        ip_addresses: collect(&IP_ADDRESS),
        urls: collect(&URL),
        http_status_codes: collect(&HTTP_STATUS),
        has_stacktrace: message.contains("Traceback") || message.contains("Exception"),
        durations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_known_formats() {
        assert_eq!(normalize_timestamp("2024-01-15 08:00:01"), "2024-01-15T08:00:01");
        assert_eq!(normalize_timestamp("2024-01-15T08:00:01"), "2024-01-15T08:00:01");
        assert_eq!(normalize_timestamp("2024-01-15T08:00:01.250Z"), "2024-01-15T08:00:01.250");
        assert_eq!(normalize_timestamp("15/Jan/2024:08:00:01"), "2024-01-15T08:00:01");
    }

    #[test]
    fn test_normalize_offset_to_utc() {
        assert_eq!(normalize_timestamp("2024-01-15T10:00:00+02:00"), "2024-01-15T08:00:00");
    }

    #[test]
    fn test_unparseable_timestamp_kept() {
        assert_eq!(normalize_timestamp("yesterday-ish"), "yesterday-ish");
    }

    #[test]
    fn test_clean_message() {
        assert_eq!(clean_message("\x1b[1;31mERROR\x1b[0m  disk\t\tfull\n"), "ERROR disk full");
        assert_eq!(clean_message("   "), "");
    }

    #[test]
    fn test_extract_fields() {
        let fields = extract_fields(
            "Exception calling https://pay.example.com/v1 from 192.168.1.20: 503 after 1500ms",
        );

        assert_eq!(fields.ip_addresses, vec!["192.168.1.20"]);
        assert_eq!(fields.urls, vec!["https://pay.example.com/v1"]);
        assert_eq!(fields.http_status_codes, vec!["503"]);
        assert!(fields.has_stacktrace);
        assert_eq!(fields.durations, vec!["1500ms"]);
    }

    #[test]
    fn test_extract_nothing() {
        let fields = extract_fields("User logged in");
        assert!(fields.is_empty());
        assert_eq!(serde_json::to_string(&fields).unwrap(), "{}");
    }
}
