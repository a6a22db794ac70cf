//! # Scribe Core
//!
//! Shared vocabulary for the retrieval engine: the [`Embedder`](traits::Embedder)
//! and [`VectorStore`](traits::VectorStore) seams, the record and result types
//! that flow between them, the error taxonomy, and the TOML configuration.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::ScribeConfig;
pub use error::{Result, ScribeError};
pub use types::{Chunk, Metadata, Record, ScoredResult};
