//! In-memory vector store: same contract as the SQLite store, nothing on disk.
//! Used by tests and throwaway sessions.

use async_trait::async_trait;
use scribe_core::error::Result;
use scribe_core::traits::VectorStore;
use scribe_core::types::Record;
use tokio::sync::RwLock;

use crate::store::validate_records;

/// Insertion-ordered record list behind an async RwLock.
#[derive(Default)]
pub struct MemoryVectorStore {
    records: RwLock<Vec<Record>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upsert(&self, records: Vec<Record>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut stored = self.records.write().await;
        let existing = stored.first().map(Record::dimension);
        validate_records(&records, existing)?;

        for record in records {
            match stored.iter_mut().find(|r| r.id == record.id) {
                Some(slot) => *slot = record,
                None => stored.push(record),
            }
        }
        Ok(())
    }

    async fn scan_all(&self) -> Result<Vec<Record>> {
        Ok(self.records.read().await.clone())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }

    async fn clear(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }

    async fn dimension(&self) -> Result<Option<usize>> {
        Ok(self.records.read().await.first().map(Record::dimension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_core::error::ScribeError;

    #[tokio::test]
    async fn test_upsert_replaces_in_place() {
        let store = MemoryVectorStore::new();
        store
            .upsert(vec![
                Record::new("a", "one", vec![1.0, 0.0]),
                Record::new("b", "two", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();
        store.upsert(vec![Record::new("a", "uno", vec![0.5, 0.5])]).await.unwrap();

        let records = store.scan_all().await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(records[0].text, "uno");
    }

    #[tokio::test]
    async fn test_rejects_mismatch_atomically() {
        let store = MemoryVectorStore::new();
        store.upsert(vec![Record::new("a", "one", vec![1.0, 0.0])]).await.unwrap();
        let err = store
            .upsert(vec![
                Record::new("b", "two", vec![0.0, 1.0]),
                Record::new("c", "three", vec![1.0]),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::DimensionMismatch { .. }));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_clear_and_has_any() {
        let store = MemoryVectorStore::new();
        assert!(!store.has_any().await.unwrap());
        store.upsert(vec![Record::new("a", "one", vec![1.0])]).await.unwrap();
        assert!(store.has_any().await.unwrap());
        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
