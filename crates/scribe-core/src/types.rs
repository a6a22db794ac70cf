//! Data model shared between the segmenter, embedder, store and ranker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Open provenance map attached to every record (chunk index, source, page...).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A contiguous slice of cleaned source text.
///
/// `start_char`/`end_char` are character offsets of the window into the
/// cleaned document; `text` is that window with surrounding whitespace trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub chunk_index: usize,
    pub start_char: usize,
    pub end_char: usize,
}

impl Chunk {
    /// Deterministic record id, stable across re-ingestion of the same text.
    pub fn record_id(&self) -> String {
        format!("chunk_{}", self.chunk_index)
    }

    /// Position metadata in the persisted (camelCase) shape.
    pub fn metadata(&self) -> Metadata {
        let mut meta = Metadata::new();
        meta.insert("chunkIndex".into(), self.chunk_index.into());
        meta.insert("startChar".into(), self.start_char.into());
        meta.insert("endChar".into(), self.end_char.into());
        meta
    }
}

/// A persisted unit owned by a vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl Record {
    pub fn new(id: impl Into<String>, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            embedding,
            metadata: Metadata::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}

/// One ranked hit returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    /// Cosine similarity in [-1, 1]; higher is more relevant.
    pub score: f32,
}

impl ScoredResult {
    /// `1 - score`. Never used for ranking.
    pub fn distance(&self) -> f32 {
        1.0 - self.score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_record_id_and_metadata() {
        let chunk = Chunk {
            text: "hello".into(),
            chunk_index: 7,
            start_char: 80,
            end_char: 90,
        };
        assert_eq!(chunk.record_id(), "chunk_7");
        let meta = chunk.metadata();
        assert_eq!(meta["chunkIndex"], 7);
        assert_eq!(meta["startChar"], 80);
        assert_eq!(meta["endChar"], 90);
    }

    #[test]
    fn test_distance_is_one_minus_score() {
        let hit = ScoredResult {
            id: "chunk_0".into(),
            text: "x".into(),
            metadata: Metadata::new(),
            score: 0.25,
        };
        assert!((hit.distance() - 0.75).abs() < 1e-6);
    }
}
