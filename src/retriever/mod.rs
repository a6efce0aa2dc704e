//! Ranked retrievers
//!
//! - Exact: case-insensitive substring counts
//! - Fuzzy: phonetic + textual similarity with a per-document feature cache
//! - Lexical: BM25 over an in-memory SQLite FTS5 index
//! - Vector: embedding similarity with MMR (in-memory or LanceDB)
//! - Hybrid: concurrent fan-out over the enabled strategies

mod exact;
mod fuzzy;
mod hybrid;
mod lance;
mod lexical;
mod phonetic;
mod pipeline;
mod similarity;
mod vector;

pub use exact::{ExactConfig, ExactMatchRetriever};
pub use fuzzy::{FuzzyConfig, FuzzyMatchRetriever, FuzzyScore};
pub use hybrid::{HybridRetriever, Retriever, RetrieverKind};
pub use lance::LanceIndex;
pub use lexical::{LexicalConfig, LexicalRetriever};
pub use phonetic::encode as phonetic_code;
pub use pipeline::{RelevanceFilter, RetrievalPipeline};
pub use vector::{
    cosine_similarity, embedding_text, mmr_select, open_index, EmbeddingIndex, IndexBackend,
    SimilarityIndex, VectorConfig, VectorRetriever, LANCE_DIR,
};
