//! Knowledge engine: one handle over embedder, store and both pipelines.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use scribe_core::config::ScribeConfig;
use scribe_core::error::{Result, ScribeError};
use scribe_core::traits::{Embedder, VectorStore};
use scribe_core::types::ScoredResult;
use serde::Serialize;

use crate::ingest::{IngestReport, IngestState, Ingestor};
use crate::query::Retriever;
use crate::store::SqliteVectorStore;

/// Store summary for `stats`.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub backend: String,
    pub embedder: String,
    pub records: usize,
    pub dimension: Option<usize>,
}

pub struct KnowledgeEngine {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    ingestor: Ingestor,
    retriever: Retriever,
    chunk_size: usize,
    overlap: usize,
    top_k: usize,
}

impl KnowledgeEngine {
    /// Wire an engine with default chunking and retrieval settings.
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self::with_config(embedder, store, &ScribeConfig::default())
    }

    /// Wire an engine from explicit components, taking tunables from `config`.
    pub fn with_config(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, config: &ScribeConfig) -> Self {
        let ingestor = Ingestor::new(embedder.clone(), store.clone()).with_batch_size(config.ingest.batch_size);
        let retriever = Retriever::new(embedder.clone(), store.clone())
            .with_separator(config.retrieval.separator.clone());
        Self {
            embedder,
            store,
            ingestor,
            retriever,
            chunk_size: config.chunking.chunk_size,
            overlap: config.chunking.overlap,
            top_k: config.retrieval.top_k,
        }
    }

    /// Build the configured embedder and the SQLite store at `store.path`.
    ///
    /// The store file is not opened until first use.
    pub fn from_config(config: &ScribeConfig) -> Result<Self> {
        let embedder = scribe_providers::create_embedder(&config.embedding)?;
        let path = config.store.resolved_path();
        tracing::info!(
            "🧠 Knowledge engine: {} ({}) → {}",
            embedder.name(),
            config.embedding.model,
            path.display()
        );
        let store = SqliteVectorStore::new(path);
        Ok(Self::with_config(Arc::new(embedder), Arc::new(store), config))
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn ingest_state(&self) -> IngestState {
        self.ingestor.state()
    }

    /// Configured `(chunk_size, overlap)`.
    pub fn chunking(&self) -> (usize, usize) {
        (self.chunk_size, self.overlap)
    }

    pub fn default_top_k(&self) -> usize {
        self.top_k
    }

    /// Replace the corpus with `document`.
    pub async fn ingest(&self, document: &str, chunk_size: usize, overlap: usize) -> Result<IngestReport> {
        self.ingestor.ingest(document, chunk_size, overlap).await
    }

    /// Ingest a text file using the configured chunking.
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestReport> {
        self.ingestor.ingest_file(path, self.chunk_size, self.overlap).await
    }

    pub async fn ingest_file_with(&self, path: &Path, chunk_size: usize, overlap: usize) -> Result<IngestReport> {
        self.ingestor.ingest_file(path, chunk_size, overlap).await
    }

    /// Top `top_k` passages for `text`, best first.
    pub async fn query(&self, text: &str, top_k: usize) -> Result<Vec<ScoredResult>> {
        self.retriever.query(text, top_k).await
    }

    pub async fn context_for(&self, text: &str, top_k: usize) -> Result<String> {
        self.retriever.context_for(text, top_k).await
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            backend: self.store.name().to_string(),
            embedder: self.embedder.name().to_string(),
            records: self.store.count().await?,
            dimension: self.store.dimension().await?,
        })
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }
}

/// Run `fut` under a deadline, mapping expiry to [`ScribeError::Timeout`].
///
/// The future is dropped on expiry; anything it already persisted stays.
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("⏱️ Operation exceeded {}ms deadline", deadline.as_millis());
            Err(ScribeError::Timeout(deadline.as_millis() as u64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryVectorStore;
    use crate::testing::StubEmbedder;

    fn memory_engine(embedder: StubEmbedder) -> KnowledgeEngine {
        KnowledgeEngine::new(Arc::new(embedder), Arc::new(MemoryVectorStore::new()))
    }

    #[tokio::test]
    async fn test_end_to_end_retrieves_exact_chunk() {
        let engine = memory_engine(StubEmbedder::new());
        let report = engine.ingest("AAAA BBBB. CCCC DDDD.", 10, 2).await.unwrap();
        assert_eq!(report.chunk_count, 3);

        let results = engine.query("B. CCCC DD", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "chunk_1");
        assert_eq!(results[0].text, "B. CCCC DD");
        assert!((results[0].score - 1.0).abs() < 1e-5);
        assert_eq!(results[0].metadata["startChar"], 8);
    }

    #[tokio::test]
    async fn test_query_before_ingest_is_empty() {
        let engine = memory_engine(StubEmbedder::new());
        assert!(engine.query("anything", 5).await.unwrap().is_empty());
        let stats = engine.stats().await.unwrap();
        assert_eq!(stats.records, 0);
        assert_eq!(stats.dimension, None);
    }

    #[tokio::test]
    async fn test_stats_and_clear() {
        let engine = memory_engine(StubEmbedder::new());
        engine.ingest("one two three four five six", 10, 3).await.unwrap();
        let stats = engine.stats().await.unwrap();
        assert_eq!(stats.backend, "memory");
        assert_eq!(stats.embedder, "stub");
        assert!(stats.records > 1);
        assert_eq!(stats.dimension, Some(crate::testing::DIM));

        engine.clear().await.unwrap();
        assert_eq!(engine.stats().await.unwrap().records, 0);
    }

    #[tokio::test]
    async fn test_sqlite_backed_round_trip() {
        let dir = std::env::temp_dir().join("scribe-engine-sqlite");
        std::fs::remove_dir_all(&dir).ok();
        let path = dir.join("vectors.db");

        {
            let store = Arc::new(SqliteVectorStore::new(&path));
            let engine = KnowledgeEngine::new(Arc::new(StubEmbedder::new()), store);
            engine.ingest("AAAA BBBB. CCCC DDDD.", 10, 2).await.unwrap();
        }

        // A fresh handle sees the persisted corpus
        let store = Arc::new(SqliteVectorStore::new(&path));
        let engine = KnowledgeEngine::new(Arc::new(StubEmbedder::new()), store);
        let results = engine.query("DDDD.", 3).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, "chunk_2");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_deadline_expiry_is_timeout() {
        let mut stub = StubEmbedder::new();
        stub.delay = Some(Duration::from_millis(500));
        let engine = memory_engine(stub);

        let err = with_deadline(Duration::from_millis(20), engine.ingest("slow text", 50, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::Timeout(20)));
        assert!(err.is_retryable());
        assert_eq!(engine.stats().await.unwrap().records, 0);
    }

    #[tokio::test]
    async fn test_deadline_passes_through_result() {
        let engine = memory_engine(StubEmbedder::new());
        let report = with_deadline(Duration::from_secs(5), engine.ingest("fast text", 50, 5))
            .await
            .unwrap();
        assert_eq!(report.chunk_count, 1);
    }

    #[test]
    fn test_from_config_requires_credential() {
        let mut config = ScribeConfig::default();
        config.embedding.provider = "openai".into();
        config.embedding.api_key = String::new();
        // Only meaningful when the ambient environment has no key
        if std::env::var("OPENAI_API_KEY").is_err() {
            assert!(matches!(
                KnowledgeEngine::from_config(&config),
                Err(ScribeError::MissingCredential(_))
            ));
        }
    }

    #[test]
    fn test_from_config_keyless_provider() {
        let mut config = ScribeConfig::default();
        config.embedding.provider = "ollama".into();
        config.store.path = std::env::temp_dir()
            .join("scribe-engine-lazy/vectors.db")
            .to_string_lossy()
            .into_owned();
        let engine = KnowledgeEngine::from_config(&config).unwrap();
        assert_eq!(engine.store().name(), "sqlite");
    }
}
