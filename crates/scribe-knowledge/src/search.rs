//! Brute-force cosine ranking over a full store scan.
//!
//! O(N·D) per query. An ANN index would slot in behind [`rank`] if the
//! corpus ever outgrows a single book.

use scribe_core::error::{Result, ScribeError};
use scribe_core::types::{Record, ScoredResult};

/// Cosine similarity of two equal-length vectors.
///
/// Returns `0.0` when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(ScribeError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Score every record against `query` and keep the `top_k` best.
///
/// Records whose dimension differs from the query are dropped. Ties keep
/// scan order.
pub fn rank(query: &[f32], records: &[Record], top_k: usize) -> Vec<ScoredResult> {
    let mut scored: Vec<(f32, &Record)> = Vec::with_capacity(records.len());
    let mut mismatched = 0usize;

    for record in records {
        match cosine_similarity(query, &record.embedding) {
            Ok(score) => scored.push((score, record)),
            Err(e) => {
                mismatched += 1;
                tracing::debug!("Excluding '{}' from ranking: {e}", record.id);
            }
        }
    }
    if mismatched > 0 {
        tracing::warn!("⚠️ {mismatched} records excluded from ranking (dimension mismatch)");
    }

    // sort_by is stable, so equal scores stay in scan order
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored
        .into_iter()
        .take(top_k)
        .map(|(score, record)| ScoredResult {
            id: record.id.clone(),
            text: record.text.clone(),
            metadata: record.metadata.clone(),
            score,
        })
        .collect()
}
