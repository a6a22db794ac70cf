//! Scribe configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, ScribeError};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScribeConfig {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl ScribeConfig {
    /// Load config from the default path (~/.scribe/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScribeError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ScribeError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ScribeError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Scribe home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".scribe")
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Registry name ("openai", "ollama") or "custom:<base-url>".
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Overrides the provider's env-var credential lookup when non-empty.
    #[serde(default)]
    pub api_key: String,
    /// Overrides the provider's base URL when non-empty.
    #[serde(default)]
    pub endpoint: String,
    /// Requested output dimension, for models that support shortening.
    #[serde(default)]
    pub dimensions: Option<usize>,
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    /// Sub-batches in flight at once; 1 keeps the sequential paced mode.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_embedding_provider() -> String { "openai".into() }
fn default_embedding_model() -> String { "text-embedding-3-small".into() }
fn default_embedding_batch_size() -> usize { 100 }
fn default_batch_delay_ms() -> u64 { 100 }
fn default_max_concurrent() -> usize { 1 }
fn default_timeout_secs() -> u64 { 30 }

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            api_key: String::new(),
            endpoint: String::new(),
            dimensions: None,
            batch_size: default_embedding_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            max_concurrent: default_max_concurrent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Segmenter defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

fn default_chunk_size() -> usize { 2000 }
fn default_overlap() -> usize { 400 }

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

/// Ingestion pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Chunks embedded and persisted per round trip.
    #[serde(default = "default_ingest_batch_size")]
    pub batch_size: usize,
}

fn default_ingest_batch_size() -> usize { 50 }

impl Default for IngestConfig {
    fn default() -> Self {
        Self { batch_size: default_ingest_batch_size() }
    }
}

/// Vector store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String { "~/.scribe/vectors.db".into() }

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: default_store_path() }
    }
}

impl StoreConfig {
    /// Store path with `~` and env vars expanded.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::full(&self.path).map(|p| p.into_owned()).unwrap_or_else(|e| {
            tracing::warn!("⚠️ Could not expand store path '{}': {e}", self.path);
            self.path.clone()
        }))
    }
}

/// Query-time configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Placed between passages when assembling a context block.
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_top_k() -> usize { 5 }
fn default_separator() -> String { "\n\n---\n\n".into() }

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            separator: default_separator(),
        }
    }
}
