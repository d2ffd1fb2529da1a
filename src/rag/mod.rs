//! Retrieval over the document corpus.
//!
//! This module provides:
//! - `Retriever`: the similarity-search contract the graph depends on
//! - `PineconeRetriever`: hosted index client
//! - `MemoryRetriever`: in-process cosine index for local runs

mod memory;
mod pinecone;
mod store;

pub use memory::{CorpusEntry, MemoryRetriever};
pub use pinecone::PineconeRetriever;
pub use store::{ChunkMetadata, DocumentChunk, Retriever};
