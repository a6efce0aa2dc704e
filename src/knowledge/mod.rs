//! Knowledge module - the article corpus
//!
//! - Document: content plus scalar metadata, store identity key
//! - Store: JSONL knowledge base, merge-by-key writes
//! - Dedup: order-preserving duplicate removal across retriever results
//! - Format: numbered document listing for downstream prompts

mod dedup;
mod document;
mod format;
mod store;

pub use dedup::{dedupe, dedupe_batches};
pub use document::{clean_metadata, Document, MetaValue, Metadata, UNKNOWN, UNTITLED};
pub use format::{format_bytes, format_docs, truncate_text};
pub use store::{get_data_dir, DocumentStore, StoreError, StoreStats, KNOWLEDGE_BASE_FILE};
