//! SQLite log store
//!
//! One `logs` table. Metadata and extracted fields are stored as JSON text.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{LogStore, SearchFilters, StoreError};
use crate::logic::ingest::{LogLevel, LogRecord};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS logs (
    id TEXT PRIMARY KEY,
    timestamp TEXT NOT NULL,
    level TEXT NOT NULL,
    service TEXT NOT NULL,
    message TEXT NOT NULL,
    metadata TEXT,
    extracted_fields TEXT NOT NULL,
    processed_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON logs(timestamp);
CREATE INDEX IF NOT EXISTS idx_logs_service ON logs(service);
CREATE INDEX IF NOT EXISTS idx_logs_level ON logs(level);
"#;

const COLUMNS: &str = "id, timestamp, level, service, message, metadata, extracted_fields";

pub struct SqliteLogStore {
    conn: Mutex<Connection>,
}

impl SqliteLogStore {
    /// Open or create the database (parent directory created if needed)
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        log::debug!("Opened log database at {:?}", path);
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}

/// Raw row; JSON columns decoded afterwards so serde errors keep their type
struct StoredRow {
    id: String,
    timestamp: String,
    level: String,
    service: String,
    message: String,
    metadata: Option<String>,
    extracted_fields: String,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            level: row.get(2)?,
            service: row.get(3)?,
            message: row.get(4)?,
            metadata: row.get(5)?,
            extracted_fields: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<LogRecord, StoreError> {
        let metadata = match self.metadata {
            Some(ref json) => Some(serde_json::from_str(json)?),
            None => None,
        };

        Ok(LogRecord {
            id: Some(self.id),
            timestamp: self.timestamp,
            level: LogLevel::parse(&self.level),
            service: self.service,
            message: self.message,
            metadata,
            extracted_fields: serde_json::from_str(&self.extracted_fields)?,
        })
    }
}

impl LogStore for SqliteLogStore {
    fn get_by_id(&self, id: &str) -> Result<Option<LogRecord>, StoreError> {
        let row = {
            let conn = self.conn.lock();
            conn.query_row(
                &format!("SELECT {} FROM logs WHERE id = ?1", COLUMNS),
                params![id],
                StoredRow::from_row,
            )
            .optional()?
        };

        row.map(StoredRow::into_record).transpose()
    }

    fn search(&self, filters: &SearchFilters, limit: usize) -> Result<Vec<LogRecord>, StoreError> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(ref query) = filters.query {
            if !query.is_empty() {
                clauses.push("instr(lower(message), lower(?)) > 0");
                values.push(query.clone());
            }
        }
        if let Some(level) = filters.level {
            clauses.push("level = ?");
            values.push(level.as_str().to_string());
        }
        if let Some(ref service) = filters.service {
            clauses.push("service = ?");
            values.push(service.clone());
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT {} FROM logs{} ORDER BY timestamp DESC, rowid DESC LIMIT {}",
            COLUMNS,
            where_clause,
            limit.min(i64::MAX as usize)
        );

        let rows = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), StoredRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        rows.into_iter().map(StoredRow::into_record).collect()
    }

    fn index(&self, record: LogRecord) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let metadata = match record.metadata {
            Some(ref m) => Some(serde_json::to_string(m)?),
            None => None,
        };
        let extracted = serde_json::to_string(&record.extracted_fields)?;
        let processed_at = chrono::Utc::now().to_rfc3339();

        self.conn.lock().execute(
            "INSERT INTO logs (id, timestamp, level, service, message, metadata, extracted_fields, processed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                record.timestamp,
                record.level.as_str(),
                record.service,
                record.message,
                metadata,
                extracted,
                processed_at
            ],
        )?;

        Ok(id)
    }
}
