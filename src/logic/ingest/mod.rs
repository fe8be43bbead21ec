//! Ingest Module - Log normalization
//!
//! Turns raw submitted entries into immutable `LogRecord`s.

pub mod preprocess;
pub mod record;

use std::fs;
use std::path::Path;

pub use preprocess::ExtractedFields;
pub use record::{LogLevel, LogRecord, RawLogEntry};

#[derive(Debug)]
pub enum IngestError {
    IoError(std::io::Error),
    /// Line number (1-based) and parse error
    ParseError { line: usize, message: String },
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::IoError(e) => write!(f, "IO Error: {}", e),
            IngestError::ParseError { line, message } => {
                write!(f, "Invalid log entry on line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for IngestError {}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        IngestError::IoError(err)
    }
}

/// Parse JSON-lines text into normalized records (blank lines skipped)
pub fn parse_jsonl(content: &str) -> Result<Vec<LogRecord>, IngestError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<RawLogEntry>(line)
                .map(LogRecord::normalize)
                .map_err(|e| IngestError::ParseError {
                    line: i + 1,
                    message: e.to_string(),
                })
        })
        .collect()
}

/// Read a JSON-lines file of raw entries
pub fn read_jsonl(path: &Path) -> Result<Vec<LogRecord>, IngestError> {
    let content = fs::read_to_string(path)?;
    parse_jsonl(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_jsonl() {
        let content = r#"
{"level":"INFO","service":"user-service","message":"login ok"}

{"level":"CRITICAL","service":"database","message":"CRITICAL: Database connection pool exhausted"}
"#;
        let records = parse_jsonl(content).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].level, LogLevel::Critical);
        assert_eq!(records[1].service, "database");
    }

    #[test]
    fn test_parse_jsonl_reports_line() {
        let content = "{\"message\":\"ok\"}\nnot json\n";
        match parse_jsonl(content) {
            Err(IngestError::ParseError { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_read_jsonl_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_jsonl(&dir.path().join("missing.jsonl"));
        assert!(matches!(result, Err(IngestError::IoError(_))));
    }
}
