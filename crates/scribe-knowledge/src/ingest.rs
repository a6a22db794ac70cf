//! Ingestion pipeline: document → chunks → embeddings → persisted records.
//!
//! ```text
//! Idle → Clearing → Chunking → EmbeddingBatch(i) → Persisting(i) → Idle
//!                                      └────────────── error ───────→ Failed
//! ```
//!
//! The store is cleared exactly once per run, before any chunk is written, so
//! a new document fully replaces the old corpus. A failure aborts the run;
//! batches already persisted stay, and a retry starts by clearing again.

use std::path::Path;
use std::sync::{Arc, Mutex};

use scribe_core::error::{Result, ScribeError};
use scribe_core::traits::{Embedder, VectorStore};
use scribe_core::types::{Metadata, Record};
use serde::Serialize;

use crate::chunker::{clean_text, segment, validate_window};
use crate::extract::read_document;

/// Default chunks per embed + persist round trip.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Where an ingestion run currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IngestState {
    Idle,
    Clearing,
    Chunking,
    EmbeddingBatch(usize),
    Persisting(usize),
    Failed(String),
}

impl std::fmt::Display for IngestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestState::Idle => write!(f, "idle"),
            IngestState::Clearing => write!(f, "clearing"),
            IngestState::Chunking => write!(f, "chunking"),
            IngestState::EmbeddingBatch(i) => write!(f, "embedding batch {}", i + 1),
            IngestState::Persisting(i) => write!(f, "persisting batch {}", i + 1),
            IngestState::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub chunk_count: usize,
    pub batch_count: usize,
    /// Length of the cleaned document in characters.
    pub characters: usize,
}

pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
    state: Mutex<IngestState>,
    /// One run at a time; a second caller waits rather than interleaving clears.
    run_lock: tokio::sync::Mutex<()>,
}

impl Ingestor {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            batch_size: DEFAULT_BATCH_SIZE,
            state: Mutex::new(IngestState::Idle),
            run_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn state(&self) -> IngestState {
        self.state.lock().map(|s| s.clone()).unwrap_or_else(|e| e.into_inner().clone())
    }

    fn set_state(&self, next: IngestState) {
        tracing::debug!("🔄 Ingest → {next}");
        match self.state.lock() {
            Ok(mut state) => *state = next,
            Err(e) => *e.into_inner() = next,
        }
    }

    /// Replace the corpus with `document`.
    pub async fn ingest(&self, document: &str, chunk_size: usize, overlap: usize) -> Result<IngestReport> {
        self.ingest_with_metadata(document, chunk_size, overlap, Metadata::new())
            .await
    }

    /// Read a text or PDF file and ingest it, tagging records with its file name.
    ///
    /// The file is read before the store is touched, so an unreadable file
    /// leaves the current corpus in place.
    pub async fn ingest_file(&self, path: &Path, chunk_size: usize, overlap: usize) -> Result<IngestReport> {
        let document = read_document(path).await?;
        let mut provenance = Metadata::new();
        if let Some(name) = path.file_name() {
            provenance.insert("source".into(), name.to_string_lossy().into_owned().into());
        }
        tracing::info!("📖 Ingesting {} ({} bytes)", path.display(), document.len());
        self.ingest_with_metadata(&document, chunk_size, overlap, provenance)
            .await
    }

    /// Like [`ingest`](Self::ingest), merging `provenance` into every record's
    /// metadata. Position fields win on key collisions.
    pub async fn ingest_with_metadata(
        &self,
        document: &str,
        chunk_size: usize,
        overlap: usize,
        provenance: Metadata,
    ) -> Result<IngestReport> {
        // Reject bad parameters before the store is touched.
        validate_window(chunk_size, overlap)?;
        if self.batch_size == 0 {
            return Err(ScribeError::InvalidConfiguration(
                "ingest batch_size must be at least 1".into(),
            ));
        }

        let _run = self.run_lock.lock().await;
        let mut guard = RunGuard { ingestor: self, finished: false };
        let outcome = self.run(document, chunk_size, overlap, &provenance).await;
        guard.finished = true;
        match outcome {
            Ok(report) => {
                self.set_state(IngestState::Idle);
                tracing::info!(
                    "✅ Ingested {} chunks in {} batches into {}",
                    report.chunk_count,
                    report.batch_count,
                    self.store.name()
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!("❌ Ingestion failed: {e}");
                self.set_state(IngestState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        document: &str,
        chunk_size: usize,
        overlap: usize,
        provenance: &Metadata,
    ) -> Result<IngestReport> {
        self.set_state(IngestState::Clearing);
        self.store.clear().await?;

        self.set_state(IngestState::Chunking);
        let cleaned = clean_text(document);
        let chunks = segment(&cleaned, chunk_size, overlap)?;
        let batch_count = chunks.len().div_ceil(self.batch_size);
        tracing::info!(
            "📦 {} chunks (size {chunk_size}, overlap {overlap}) in {batch_count} batches",
            chunks.len()
        );

        for (i, batch) in chunks.chunks(self.batch_size).enumerate() {
            self.set_state(IngestState::EmbeddingBatch(i));
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(ScribeError::EmbeddingUnavailable(format!(
                    "{} returned {} embeddings for {} chunks",
                    self.embedder.name(),
                    embeddings.len(),
                    batch.len()
                )));
            }

            self.set_state(IngestState::Persisting(i));
            let records: Vec<Record> = batch
                .iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| {
                    let mut metadata = provenance.clone();
                    metadata.extend(chunk.metadata());
                    Record::new(chunk.record_id(), chunk.text.clone(), embedding).with_metadata(metadata)
                })
                .collect();
            self.store.upsert(records).await?;
            tracing::debug!("  Batch {}/{batch_count} persisted ({} chunks)", i + 1, batch.len());
        }

        Ok(IngestReport {
            chunk_count: chunks.len(),
            batch_count,
            characters: cleaned.chars().count(),
        })
    }
}

/// Marks a run `Failed` if its future is dropped before it finishes.
struct RunGuard<'a> {
    ingestor: &'a Ingestor,
    finished: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("⚠️ Ingestion cancelled at {}", self.ingestor.state());
            self.ingestor.set_state(IngestState::Failed("cancelled".into()));
        }
    }
}
