//! Store Module - Log storage and search
//!
//! The analysis layer talks to storage only through `LogStore`.
//!
//! # Components
//! - `memory.rs`: in-process store (tests, one-shot CLI runs)
//! - `sqlite.rs`: persistent store on rusqlite

pub mod memory;
pub mod sqlite;

pub use memory::MemoryLogStore;
pub use sqlite::SqliteLogStore;

use serde::{Deserialize, Serialize};

use crate::logic::ingest::{LogLevel, LogRecord};

// ============================================================================
// FILTERS
// ============================================================================

/// Search filters; `None` matches everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Substring of the message, case-insensitive for ASCII letters only
    /// (the same folding as SQLite `lower()`)
    pub query: Option<String>,
    pub level: Option<LogLevel>,
    pub service: Option<String>,
}

impl SearchFilters {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_service(service: &str) -> Self {
        Self {
            service: Some(service.to_string()),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query = Some(query.to_string());
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn matches(&self, record: &LogRecord) -> bool {
        if let Some(level) = self.level {
            if record.level != level {
                return false;
            }
        }
        if let Some(ref service) = self.service {
            if &record.service != service {
                return false;
            }
        }
        match self.query {
            Some(ref q) if !q.is_empty() => record
                .message
                .to_ascii_lowercase()
                .contains(&q.to_ascii_lowercase()),
            _ => true,
        }
    }
}

// ============================================================================
// TRAIT
// ============================================================================

pub trait LogStore: Send + Sync {
    fn get_by_id(&self, id: &str) -> Result<Option<LogRecord>, StoreError>;

    /// Up to `limit` matches, newest first
    fn search(&self, filters: &SearchFilters, limit: usize) -> Result<Vec<LogRecord>, StoreError>;

    /// Store a record and return the assigned id
    fn index(&self, record: LogRecord) -> Result<String, StoreError>;
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub enum StoreError {
    Database(rusqlite::Error),
    SerializationError(serde_json::Error),
    IoError(std::io::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "Database error: {}", e),
            StoreError::SerializationError(e) => write!(f, "Serialization error: {}", e),
            StoreError::IoError(e) => write!(f, "IO Error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::SerializationError(err)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::IoError(err)
    }
}
