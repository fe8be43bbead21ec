//! In-memory log store

use parking_lot::RwLock;
use uuid::Uuid;

use super::{LogStore, SearchFilters, StoreError};
use crate::logic::ingest::LogRecord;

/// Records kept in insertion order
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    records: RwLock<Vec<LogRecord>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with records (ids assigned where missing)
    pub fn with_records(records: impl IntoIterator<Item = LogRecord>) -> Self {
        let store = Self::new();
        {
            let mut guard = store.records.write();
            for record in records {
                let record = match record.id {
                    Some(_) => record,
                    None => record.with_id(Uuid::new_v4().to_string()),
                };
                guard.push(record);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl LogStore for MemoryLogStore {
    fn get_by_id(&self, id: &str) -> Result<Option<LogRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .iter()
            .find(|r| r.id.as_deref() == Some(id))
            .cloned())
    }

    fn search(&self, filters: &SearchFilters, limit: usize) -> Result<Vec<LogRecord>, StoreError> {
        let records = self.records.read();

        // Later insertions win ties on timestamp
        let mut hits: Vec<(usize, &LogRecord)> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| filters.matches(r))
            .collect();
        hits.sort_by(|(ia, a), (ib, b)| b.timestamp.cmp(&a.timestamp).then(ib.cmp(ia)));

        Ok(hits.into_iter().take(limit).map(|(_, r)| r.clone()).collect())
    }

    fn index(&self, record: LogRecord) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.records.write().push(record.with_id(id.clone()));
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::ingest::LogLevel;

    #[test]
    fn test_index_and_get() {
        let store = MemoryLogStore::new();
        let id = store
            .index(LogRecord::new(LogLevel::Info, "api", "hello"))
            .unwrap();

        let record = store.get_by_id(&id).unwrap().unwrap();
        assert_eq!(record.id.as_deref(), Some(id.as_str()));
        assert_eq!(record.message, "hello");
        assert!(store.get_by_id("missing").unwrap().is_none());
    }

    #[test]
    fn test_search_newest_first() {
        let store = MemoryLogStore::with_records(vec![
            LogRecord::new(LogLevel::Info, "api", "first").at("2024-01-01T00:00:01"),
            LogRecord::new(LogLevel::Info, "api", "third").at("2024-01-01T00:00:03"),
            LogRecord::new(LogLevel::Info, "db", "second").at("2024-01-01T00:00:02"),
        ]);

        let all = store.search(&SearchFilters::all(), 10).unwrap();
        let messages: Vec<&str> = all.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["third", "second", "first"]);

        let limited = store.search(&SearchFilters::for_service("api"), 1).unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].message, "third");
    }

    #[test]
    fn test_equal_timestamps_prefer_latest_insert() {
        let store = MemoryLogStore::new();
        store
            .index(LogRecord::new(LogLevel::Info, "api", "older").at("2024-01-01T00:00:00"))
            .unwrap();
        store
            .index(LogRecord::new(LogLevel::Info, "api", "newer").at("2024-01-01T00:00:00"))
            .unwrap();

        let hits = store.search(&SearchFilters::all(), 10).unwrap();
        assert_eq!(hits[0].message, "newer");
    }
}
