//! # Scribe Providers
//!
//! Embedding provider implementations for Scribe.
//!
//! Every OpenAI-compatible `/embeddings` endpoint (OpenAI, Ollama, Mistral,
//! Together, custom servers) is served by a single `OpenAiCompatibleEmbedder`.
//! `BatchingEmbedder` wraps any embedder with sub-batching and pacing.

pub mod batching;
pub mod openai_compatible;
pub mod provider_registry;

use std::time::Duration;

use scribe_core::config::EmbeddingConfig;
use scribe_core::error::{Result, ScribeError};
use scribe_core::traits::Embedder;

pub use batching::{BatchPolicy, BatchingEmbedder};
pub use openai_compatible::OpenAiCompatibleEmbedder;

/// Create the configured embedder, wrapped in the batching client.
///
/// Provider name is either a registry entry or `custom:<base-url>`.
/// Fails with `MissingCredential` before any network call if the provider
/// needs a key and none resolves.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<BatchingEmbedder<Box<dyn Embedder>>> {
    let inner: Box<dyn Embedder> = match config.provider.as_str() {
        other if other.starts_with("custom:") => {
            Box::new(OpenAiCompatibleEmbedder::custom(other, config)?)
        }
        name => {
            let registry = provider_registry::get_provider_config(name).ok_or_else(|| {
                ScribeError::InvalidConfiguration(format!("unknown embedding provider '{name}'"))
            })?;
            Box::new(OpenAiCompatibleEmbedder::from_registry(registry, config)?)
        }
    };

    let policy = BatchPolicy {
        batch_size: config.batch_size,
        delay: Duration::from_millis(config.batch_delay_ms),
        max_concurrent: config.max_concurrent,
    };
    BatchingEmbedder::new(inner, policy)
}

/// List all available provider names.
pub fn available_providers() -> Vec<&'static str> {
    let mut names = provider_registry::all_provider_names();
    names.push("custom");
    names
}
