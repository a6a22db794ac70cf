//! Stub embedders shared by the pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use scribe_core::error::{Result, ScribeError};
use scribe_core::traits::Embedder;

pub(crate) const DIM: usize = 32;

/// Deterministic text → vector: hashed character bigram counts.
pub(crate) fn hash_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    let chars: Vec<char> = text.chars().collect();
    for pair in chars.windows(2) {
        let mut h: u32 = 2166136261;
        for c in pair {
            h ^= *c as u32;
            h = h.wrapping_mul(16777619);
        }
        v[(h as usize) % DIM] += 1.0;
    }
    if let Some(c) = chars.first() {
        v[(*c as usize) % DIM] += 0.5;
    }
    v
}

/// Stub with optional failure injection and latency.
pub(crate) struct StubEmbedder {
    pub batch_calls: AtomicUsize,
    pub single_calls: AtomicUsize,
    /// `embed_batch` call number (1-based) that fails.
    pub fail_on_batch: Option<usize>,
    /// Error returned by every single `embed` call.
    pub fail_single: Option<fn() -> ScribeError>,
    pub delay: Option<Duration>,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self {
            batch_calls: AtomicUsize::new(0),
            single_calls: AtomicUsize::new(0),
            fail_on_batch: None,
            fail_single: None,
            delay: None,
        }
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    fn name(&self) -> &str {
        "stub"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(make_err) = self.fail_single {
            return Err(make_err());
        }
        Ok(hash_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let call = self.batch_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on_batch == Some(call) {
            return Err(ScribeError::EmbeddingUnavailable("stub outage".into()));
        }
        Ok(texts.iter().map(|t| hash_vector(t)).collect())
    }
}
