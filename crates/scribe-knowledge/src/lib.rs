//! # Scribe Knowledge
//!
//! Retrieval-augmented generation over a single book-length corpus.
//!
//! ## Design
//! - **Sliding-window chunking** with configurable size and overlap
//! - **Remote embeddings** through the batching client in `scribe-providers`
//! - **SQLite** for persistence, one row per chunk, embedding as an f32 BLOB
//! - **Brute-force cosine ranking**, exact and stable
//!
//! ## How it works
//! ```text
//! Book text (.txt or .pdf)
//!   ↓ clean + segment
//! chunk_0 … chunk_N  (text, chunkIndex, startChar, endChar)
//!   ↓ embed in batches of 50
//! SQLite `vectors` table
//!
//! Question
//!   ↓ embed
//! cosine vs every stored vector → top K
//!   ↓
//! passages joined with "---" into the system prompt
//! ```

pub mod chunker;
pub mod engine;
pub mod extract;
pub mod ingest;
pub mod memory;
pub mod query;
pub mod search;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{KnowledgeEngine, StoreStats, with_deadline};
pub use extract::{DocumentKind, read_document};
pub use ingest::{IngestReport, IngestState, Ingestor};
pub use memory::MemoryVectorStore;
pub use query::{Retriever, build_context};
pub use search::{cosine_similarity, rank};
pub use store::SqliteVectorStore;
