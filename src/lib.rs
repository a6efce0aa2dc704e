//! chitrapur-rag - search and retrieval over a magazine article archive
//!
//! Two independent entry points over one JSONL knowledge base:
//! a hybrid retriever (exact, fuzzy, BM25 and vector strategies fanned out
//! concurrently) and a boolean AND/OR query engine with snippets.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod knowledge;
pub mod query;
pub mod retriever;

// Re-exports
pub use config::Settings;
pub use embedding::{create_embedder, EmbeddingProvider, GeminiEmbedding, HashingEmbedding};
pub use knowledge::{dedupe, format_docs, Document, DocumentStore, MetaValue};
pub use query::{parse, parse_strict, QueryExpr, SearchEngine};
pub use retriever::{HybridRetriever, RetrievalPipeline, Retriever, RetrieverKind};
