//! Embedding capability trait.

use async_trait::async_trait;

use crate::error::Result;

/// Converts text into fixed-dimension vectors.
///
/// Implementations must be deterministic for identical input and must return
/// exactly one vector per input, in input order. A failed batch yields no
/// partial output.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many texts, preserving order and length.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[async_trait]
impl<E: Embedder + ?Sized> Embedder for std::sync::Arc<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts).await
    }
}

#[async_trait]
impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts).await
    }
}
