//! Query pipeline: question → embedding → ranked passages → context block.

use std::sync::Arc;

use scribe_core::error::{Result, ScribeError};
use scribe_core::traits::{Embedder, VectorStore};
use scribe_core::types::ScoredResult;

use crate::search::rank;

/// Separator placed between passages in a context block.
pub const DEFAULT_SEPARATOR: &str = "\n\n---\n\n";

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    separator: String,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            separator: DEFAULT_SEPARATOR.into(),
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Top `top_k` stored passages for `text`, best first.
    ///
    /// An empty store or a blank question yields no results rather than an error.
    pub async fn query(&self, text: &str, top_k: usize) -> Result<Vec<ScoredResult>> {
        if top_k == 0 {
            return Err(ScribeError::InvalidConfiguration(
                "top_k must be at least 1".into(),
            ));
        }
        if text.trim().is_empty() {
            tracing::debug!("Blank query, nothing to retrieve");
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(text).await?;
        if !self.store.has_any().await? {
            tracing::info!("📭 Store '{}' is empty, no passages to rank", self.store.name());
            return Ok(Vec::new());
        }

        let records = self.store.scan_all().await?;
        let results = rank(&vector, &records, top_k);
        tracing::debug!(
            "🔍 Ranked {} records, returning {} (best score {:.4})",
            records.len(),
            results.len(),
            results.first().map(|r| r.score).unwrap_or_default()
        );
        Ok(results)
    }

    /// Retrieved passages joined into a single prompt-ready block.
    ///
    /// Embedding or store outages degrade to an empty context so a chat
    /// turn can still proceed. Configuration and credential errors propagate.
    pub async fn context_for(&self, text: &str, top_k: usize) -> Result<String> {
        match self.query(text, top_k).await {
            Ok(results) => Ok(build_context(&results, &self.separator)),
            Err(e) if e.is_retryable() => {
                tracing::warn!("⚠️ Retrieval unavailable, continuing without context: {e}");
                Ok(String::new())
            }
            Err(e) => Err(e),
        }
    }
}

/// Join passage texts in rank order.
pub fn build_context(results: &[ScoredResult], separator: &str) -> String {
    results
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryVectorStore;
    use crate::testing::{StubEmbedder, hash_vector};
    use scribe_core::types::Record;
    use std::sync::atomic::Ordering;

    async fn seeded(embedder: StubEmbedder) -> (Arc<StubEmbedder>, Retriever) {
        let embedder = Arc::new(embedder);
        let store = Arc::new(MemoryVectorStore::new());
        let passages = ["integrity under pressure", "fathers and sons", "courage is a habit"];
        let records = passages
            .iter()
            .enumerate()
            .map(|(i, t)| Record::new(format!("chunk_{i}"), *t, hash_vector(t)))
            .collect();
        store.upsert(records).await.unwrap();
        (embedder.clone(), Retriever::new(embedder, store))
    }

    #[tokio::test]
    async fn test_exact_passage_ranks_first() {
        let (_, retriever) = seeded(StubEmbedder::new()).await;
        let results = retriever.query("fathers and sons", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "chunk_1");
        assert!((results[0].score - 1.0).abs() < 1e-5);
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_top_k_larger_than_corpus() {
        let (_, retriever) = seeded(StubEmbedder::new()).await;
        let results = retriever.query("courage", 50).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_zero_top_k_rejected() {
        let (embedder, retriever) = seeded(StubEmbedder::new()).await;
        let err = retriever.query("anything", 0).await.unwrap_err();
        assert!(matches!(err, ScribeError::InvalidConfiguration(_)));
        assert_eq!(embedder.single_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_store_returns_nothing() {
        let embedder = Arc::new(StubEmbedder::new());
        let retriever = Retriever::new(embedder.clone(), Arc::new(MemoryVectorStore::new()));
        assert!(retriever.query("hello", 5).await.unwrap().is_empty());
        assert_eq!(retriever.context_for("hello", 5).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_blank_query_skips_embedding() {
        let (embedder, retriever) = seeded(StubEmbedder::new()).await;
        assert!(retriever.query("   ", 3).await.unwrap().is_empty());
        assert_eq!(embedder.single_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_context_joins_in_rank_order() {
        let (_, retriever) = seeded(StubEmbedder::new()).await;
        let retriever = retriever.with_separator(" | ");
        let context = retriever.context_for("courage is a habit", 2).await.unwrap();
        assert!(context.starts_with("courage is a habit | "));
        assert_eq!(context.matches(" | ").count(), 1);
    }

    #[test]
    fn test_build_context_default_separator() {
        let results = vec![
            ScoredResult { id: "a".into(), text: "first".into(), metadata: Default::default(), score: 0.9 },
            ScoredResult { id: "b".into(), text: "second".into(), metadata: Default::default(), score: 0.5 },
        ];
        assert_eq!(build_context(&results, DEFAULT_SEPARATOR), "first\n\n---\n\nsecond");
        assert_eq!(build_context(&[], DEFAULT_SEPARATOR), "");
    }

    fn outage() -> ScribeError {
        ScribeError::EmbeddingUnavailable("503".into())
    }

    fn no_key() -> ScribeError {
        ScribeError::MissingCredential("OPENAI_API_KEY".into())
    }

    #[tokio::test]
    async fn test_context_degrades_on_outage() {
        let mut stub = StubEmbedder::new();
        stub.fail_single = Some(outage);
        let (_, retriever) = seeded(stub).await;

        assert!(retriever.query("fathers", 3).await.is_err());
        assert_eq!(retriever.context_for("fathers", 3).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_context_propagates_missing_credential() {
        let mut stub = StubEmbedder::new();
        stub.fail_single = Some(no_key);
        let (_, retriever) = seeded(stub).await;

        let err = retriever.context_for("fathers", 3).await.unwrap_err();
        assert!(matches!(err, ScribeError::MissingCredential(_)));
    }
}
