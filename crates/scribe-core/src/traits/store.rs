//! Durable vector store trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Record;

/// Persistence for embedded records.
///
/// Every store holds embeddings of a single dimension. Writes are atomic per
/// call and serialized; reads never observe a half-written batch.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name used in logs.
    fn name(&self) -> &str;

    /// Insert or replace by id. All records land, or none do.
    async fn upsert(&self, records: Vec<Record>) -> Result<()>;

    /// Every stored record, in an unspecified but stable order.
    async fn scan_all(&self) -> Result<Vec<Record>>;

    async fn count(&self) -> Result<usize>;

    async fn has_any(&self) -> Result<bool> {
        Ok(self.count().await? > 0)
    }

    /// Delete every record.
    async fn clear(&self) -> Result<()>;

    /// Embedding dimension of the stored corpus, or `None` when empty.
    async fn dimension(&self) -> Result<Option<usize>>;
}
