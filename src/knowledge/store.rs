//! Document Store - JSONL knowledge base
//!
//! One serialized [`Document`] per line. The store is loaded once and is
//! read-only for retrieval; writes go through [`DocumentStore::save_merged`],
//! which merges by store identity key and rewrites the whole file.
//! Default location: <local data dir>/.chitrapur-rag/knowledge_base.jsonl
//! (`~/.local/share` on Linux; the home directory when no data dir exists)

use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::document::Document;

/// Knowledge base file name inside the data directory
pub const KNOWLEDGE_BASE_FILE: &str = "knowledge_base.jsonl";

// ============================================================================
// Data Directory
// ============================================================================

/// Data directory: `.chitrapur-rag` under the platform local data directory,
/// falling back to the home directory
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".chitrapur-rag")
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{path}:{line}: malformed document: {source}")]
    Malformed {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Store statistics
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub document_count: usize,
    pub source_count: usize,
    pub total_content_bytes: usize,
    pub path: PathBuf,
    pub modified: Option<DateTime<Utc>>,
}

// ============================================================================
// DocumentStore
// ============================================================================

/// Ordered, read-only collection of documents loaded from a JSONL file
#[derive(Debug, Clone)]
pub struct DocumentStore {
    documents: Arc<[Document]>,
    path: PathBuf,
}

impl DocumentStore {
    /// Loads the store from `path`.
    ///
    /// A missing file yields an empty store.
    pub fn open(path: &Path) -> Result<Self> {
        let documents = load_documents(path)?;
        tracing::info!("Loaded {} documents from {:?}", documents.len(), path);

        Ok(Self {
            documents: documents.into(),
            path: path.to_path_buf(),
        })
    }

    /// Opens the knowledge base in the default data directory
    pub fn open_default() -> Result<Self> {
        Self::open(&get_data_dir().join(KNOWLEDGE_BASE_FILE))
    }

    /// In-memory store with no backing file contents
    pub fn from_documents(documents: Vec<Document>) -> Self {
        Self {
            documents: documents.into(),
            path: PathBuf::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Shared handle to the documents for retrievers
    pub fn shared(&self) -> Arc<[Document]> {
        Arc::clone(&self.documents)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Looks up a document by its store identity key
    pub fn get(&self, key: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.key() == key)
    }

    /// Merges `docs` into the file at `path` and rewrites it.
    ///
    /// Existing documents keep their position; a document whose key already
    /// exists replaces the stored one, new keys are appended.
    ///
    /// # Returns
    /// Number of documents in the file after the merge
    pub fn save_merged(path: &Path, docs: &[Document]) -> Result<usize> {
        let merged = merge_by_key(load_documents(path)?, docs.iter().cloned());

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create knowledge base directory")?;
            }
        }

        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {:?}", path))?;
        let mut writer = BufWriter::new(file);
        for doc in &merged {
            serde_json::to_writer(&mut writer, doc).context("Failed to serialize document")?;
            writer.write_all(b"\n")?;
        }
        writer.flush().context("Failed to write knowledge base")?;

        tracing::info!(
            "Merged {} documents into {:?} ({} total)",
            docs.len(),
            path,
            merged.len()
        );
        Ok(merged.len())
    }

    /// Store statistics
    pub fn stats(&self) -> StoreStats {
        let mut sources: Vec<String> = self.documents.iter().map(|d| d.source()).collect();
        sources.sort();
        sources.dedup();

        let modified = std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        StoreStats {
            document_count: self.documents.len(),
            source_count: sources.len(),
            total_content_bytes: self.documents.iter().map(|d| d.content.len()).sum(),
            path: self.path.clone(),
            modified,
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Reads every document from a JSONL file; missing file → empty
fn load_documents(path: &Path) -> Result<Vec<Document>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("Knowledge base {:?} not found, starting empty", path);
            return Ok(Vec::new());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to read {:?}", path)),
    };

    let mut documents = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let doc: Document = serde_json::from_str(line).map_err(|source| StoreError::Malformed {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        })?;
        documents.push(doc);
    }
    Ok(documents)
}

/// Insertion-ordered merge keyed by [`Document::key`]
fn merge_by_key(
    existing: Vec<Document>,
    incoming: impl IntoIterator<Item = Document>,
) -> Vec<Document> {
    let mut merged: Vec<Document> = Vec::with_capacity(existing.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for doc in existing.into_iter().chain(incoming) {
        match index.get(&doc.key()) {
            Some(&pos) => merged[pos] = doc,
            None => {
                index.insert(doc.key(), merged.len());
                merged.push(doc);
            }
        }
    }
    merged
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn article(source: &str, title: &str, content: &str) -> Document {
        Document::new(content)
            .with_meta("source", source)
            .with_meta("title", title)
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::open(&dir.path().join("nope.jsonl")).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.stats().document_count, 0);
    }

    #[test]
    fn test_save_and_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kb.jsonl");

        let count = DocumentStore::save_merged(
            &path,
            &[article("a.pdf", "One", "first"), article("a.pdf", "Two", "second")],
        )
        .unwrap();
        assert_eq!(count, 2);

        let store = DocumentStore::open(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.documents()[0].content, "first");
        assert_eq!(store.get("a.pdf-Two").unwrap().content, "second");
    }

    #[test]
    fn test_merge_overwrites_by_key_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kb.jsonl");

        DocumentStore::save_merged(
            &path,
            &[article("a.pdf", "One", "old"), article("b.pdf", "Two", "keep")],
        )
        .unwrap();
        DocumentStore::save_merged(
            &path,
            &[article("a.pdf", "One", "new"), article("c.pdf", "Three", "added")],
        )
        .unwrap();

        let store = DocumentStore::open(&path).unwrap();
        let contents: Vec<&str> = store.documents().iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["new", "keep", "added"]);
    }

    #[test]
    fn test_merge_within_one_batch_keeps_last() {
        let merged = merge_by_key(
            vec![],
            vec![article("s", "t", "1"), article("s", "t", "2")],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].content, "2");
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kb.jsonl");
        std::fs::write(
            &path,
            "{\"page_content\":\"ok\",\"metadata\":{}}\n\nnot json\n",
        )
        .unwrap();

        let err = DocumentStore::open(&path).unwrap_err();
        assert!(err.to_string().contains(":3:"), "{}", err);
    }

    #[test]
    fn test_data_dir_location() {
        let dir = get_data_dir();
        assert!(dir.ends_with(".chitrapur-rag"));
        let expected_parent = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        assert_eq!(dir.parent(), Some(expected_parent.as_path()));
    }

    #[test]
    fn test_stats() {
        let store = DocumentStore::from_documents(vec![
            article("a.pdf", "One", "12345"),
            article("a.pdf", "Two", "678"),
            article("b.pdf", "Three", "90"),
        ]);
        let stats = store.stats();
        assert_eq!(stats.document_count, 3);
        assert_eq!(stats.source_count, 2);
        assert_eq!(stats.total_content_bytes, 10);
        assert!(stats.modified.is_none());
    }
}
