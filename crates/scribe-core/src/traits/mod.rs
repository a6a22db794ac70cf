//! Trait seams between the engine and its external collaborators.

pub mod embedder;
pub mod store;

pub use embedder::Embedder;
pub use store::VectorStore;
