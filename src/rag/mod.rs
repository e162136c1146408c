//! Retrieval-augmented generation plumbing.
//!
//! - [`EmbeddingProvider`]: text -> vectors, with quota backoff
//! - [`VectorIndexClient`]: nearest-neighbour IDs from the deployed index
//! - [`TextStore`]: chunk text keyed by the same IDs (SQLite or PostgreSQL)
//! - [`IngestionPipeline`]: documents -> chunks -> embeddings -> stores
//! - [`Retriever`]: query -> ranked passages

pub mod auth;
pub mod chunker;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod postgres;
pub mod retrieval;
pub mod sqlite;
pub mod store;
pub mod upload;

pub use auth::GoogleTokenSource;
pub use chunker::{split_into_chunks, Chunk, ChunkingConfig};
pub use embedding::{EmbeddingBackend, EmbeddingProvider, RetryPolicy, VertexEmbeddingBackend};
pub use error::RagError;
pub use extract::{FileTextExtractor, TextExtractor};
pub use index::{VectorIndex, VectorIndexClient, VertexVectorIndex};
pub use ingest::{IngestOptions, IngestReport, IngestionPipeline};
pub use retrieval::{Retriever, SearchOutcome, SearchTrace};
pub use postgres::PgTextStore;
pub use sqlite::SqliteTextStore;
pub use store::{open_text_store, CorpusAudit, StoreBackend, TextStore};
pub use upload::{GcsObjectStore, ObjectStore};
