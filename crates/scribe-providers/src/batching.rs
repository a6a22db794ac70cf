//! Batching embedder: splits large inputs into provider-sized sub-batches.
//!
//! Sequential mode (the default) issues one sub-batch at a time with a short
//! pause between calls to stay under provider rate limits. With
//! `max_concurrent > 1` sub-batches run through an order-preserving bounded
//! stream instead. Either way the first failing sub-batch aborts the call.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt, TryStreamExt};
use scribe_core::error::{Result, ScribeError};
use scribe_core::traits::Embedder;

/// Sub-batching and pacing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    /// Max inputs per provider call.
    pub batch_size: usize,
    /// Pause between sequential sub-batches.
    pub delay: Duration,
    /// Sub-batches in flight at once.
    pub max_concurrent: usize,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            batch_size: 100,
            delay: Duration::from_millis(100),
            max_concurrent: 1,
        }
    }
}

/// Wraps an embedder with sub-batching and pacing.
pub struct BatchingEmbedder<E> {
    inner: E,
    policy: BatchPolicy,
}

impl<E: Embedder> BatchingEmbedder<E> {
    pub fn new(inner: E, policy: BatchPolicy) -> Result<Self> {
        if policy.batch_size == 0 {
            return Err(ScribeError::InvalidConfiguration(
                "embedding batch_size must be at least 1".into(),
            ));
        }
        if policy.max_concurrent == 0 {
            return Err(ScribeError::InvalidConfiguration(
                "embedding max_concurrent must be at least 1".into(),
            ));
        }
        Ok(Self { inner, policy })
    }

    pub fn policy(&self) -> BatchPolicy {
        self.policy
    }

    async fn call_inner(&self, index: usize, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        tracing::debug!(
            "📦 {} sub-batch {} ({} inputs)",
            self.inner.name(),
            index + 1,
            batch.len()
        );
        let vectors = self.inner.embed_batch(batch).await?;
        if vectors.len() != batch.len() {
            return Err(ScribeError::EmbeddingUnavailable(format!(
                "{} returned {} embeddings for {} inputs",
                self.inner.name(),
                vectors.len(),
                batch.len()
            )));
        }
        Ok(vectors)
    }
}

#[async_trait]
impl<E: Embedder> Embedder for BatchingEmbedder<E> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let total = texts.len().div_ceil(self.policy.batch_size);
        let mut out = Vec::with_capacity(texts.len());

        if self.policy.max_concurrent <= 1 {
            for (i, batch) in texts.chunks(self.policy.batch_size).enumerate() {
                out.extend(self.call_inner(i, batch).await?);
                if i + 1 < total && !self.policy.delay.is_zero() {
                    tokio::time::sleep(self.policy.delay).await;
                }
            }
        } else {
            // Boxed up front so the buffered stream holds one concrete Send future type
            let calls: Vec<BoxFuture<'_, Result<Vec<Vec<f32>>>>> = texts
                .chunks(self.policy.batch_size)
                .enumerate()
                .map(|(i, batch)| self.call_inner(i, batch).boxed())
                .collect();
            let results: Vec<Vec<Vec<f32>>> = stream::iter(calls)
                .buffered(self.policy.max_concurrent)
                .try_collect()
                .await?;
            for vectors in results {
                out.extend(vectors);
            }
        }

        Ok(out)
    }
}
