//! LanceDB Similarity Index - persistent article embeddings
//!
//! One row per document, keyed by the store identity key and stamped with a
//! SHA-256 of the embedded text. [`LanceIndex::index_documents`] embeds new
//! keys and re-embeds keys whose text changed since they were indexed.
//! ref: https://lancedb.github.io/lancedb/

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use sha2::{Digest, Sha256};

use super::vector::{embedding_text, mmr_select, SimilarityIndex};
use crate::embedding::EmbeddingProvider;
use crate::knowledge::Document;

const TABLE_NAME: &str = "articles";

/// Documents embedded per provider call
const INDEX_BATCH_SIZE: usize = 32;

// ============================================================================
// LanceIndex
// ============================================================================

pub struct LanceIndex {
    db: Connection,
    embedder: Arc<dyn EmbeddingProvider>,
    documents: Arc<[Document]>,
    positions: HashMap<String, usize>,
    lambda: f32,
}

impl LanceIndex {
    /// Opens (or creates) the LanceDB directory
    ///
    /// # Arguments
    /// * `path` - .lance directory
    /// * `embedder` - provider used for both indexing and queries
    /// * `documents` - the store the table rows refer to
    /// * `lambda` - MMR trade-off
    pub async fn open(
        path: &Path,
        embedder: Arc<dyn EmbeddingProvider>,
        documents: Arc<[Document]>,
        lambda: f32,
    ) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .context("Failed to create LanceDB directory")?;
            }
        }

        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid path encoding"))?;

        let db = lancedb::connect(path_str)
            .execute()
            .await
            .context("Failed to connect to LanceDB")?;

        // first occurrence wins for repeated keys
        let mut positions = HashMap::new();
        for (i, doc) in documents.iter().enumerate() {
            positions.entry(doc.key()).or_insert(i);
        }

        Ok(Self {
            db,
            embedder,
            documents,
            positions,
            lambda,
        })
    }

    fn schema(&self) -> Schema {
        Schema::new(vec![
            Field::new("doc_key", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("content_hash", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.embedder.dimension() as i32,
                ),
                false,
            ),
        ])
    }

    fn to_batch(&self, docs: &[&Document], embeddings: &[Vec<f32>]) -> Result<RecordBatch> {
        let dimension = self.embedder.dimension();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dimension) {
            anyhow::bail!(
                "Embedding has {} values, expected {}",
                bad.len(),
                dimension
            );
        }

        let keys: Vec<String> = docs.iter().map(|d| d.key()).collect();
        let titles: Vec<String> = docs.iter().map(|d| d.title()).collect();
        let hashes: Vec<String> = docs.iter().map(|d| content_hash(d)).collect();
        let flat: Vec<f32> = embeddings.iter().flatten().copied().collect();

        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let embedding_list = FixedSizeListArray::try_new(
            field,
            dimension as i32,
            Arc::new(Float32Array::from(flat)) as Arc<dyn Array>,
            None,
        )
        .context("Failed to create embedding array")?;

        RecordBatch::try_new(
            Arc::new(self.schema()),
            vec![
                Arc::new(StringArray::from(keys)),
                Arc::new(StringArray::from(titles)),
                Arc::new(StringArray::from(hashes)),
                Arc::new(embedding_list),
            ],
        )
        .context("Failed to create RecordBatch")
    }

    async fn table_exists(&self) -> Result<bool> {
        let names = self
            .db
            .table_names()
            .execute()
            .await
            .context("Failed to list LanceDB tables")?;
        Ok(names.iter().any(|n| n == TABLE_NAME))
    }

    async fn open_table(&self) -> Result<lancedb::table::Table> {
        self.db
            .open_table(TABLE_NAME)
            .execute()
            .await
            .context("Failed to open articles table")
    }

    async fn insert(&self, batch: RecordBatch) -> Result<()> {
        let schema = batch.schema();
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

        if self.table_exists().await? {
            let table = self.open_table().await?;
            table
                .add(batches)
                .execute()
                .await
                .context("Failed to add embeddings")?;
        } else {
            self.db
                .create_table(TABLE_NAME, batches)
                .execute()
                .await
                .context("Failed to create articles table")?;
        }
        Ok(())
    }

    /// Embeds documents that are missing from the table or whose text changed
    ///
    /// # Returns
    /// Number of rows (re-)embedded
    pub async fn index_documents(&self) -> Result<usize> {
        let mut seen = HashSet::new();
        let mut pending: Vec<&Document> = Vec::new();
        let mut stale: Vec<String> = Vec::new();

        for doc in self.documents.iter() {
            let key = doc.key();
            if !seen.insert(key.clone()) {
                continue;
            }
            match self.row_state(&key, &content_hash(doc)).await? {
                RowState::Current => {}
                RowState::Missing => pending.push(doc),
                RowState::Stale => {
                    stale.push(key);
                    pending.push(doc);
                }
            }
        }

        if pending.is_empty() {
            return Ok(0);
        }
        tracing::info!(
            "Embedding {} documents into LanceDB ({} changed)",
            pending.len(),
            stale.len()
        );

        if !stale.is_empty() {
            let table = self.open_table().await?;
            for key in &stale {
                table
                    .delete(&key_filter(key))
                    .await
                    .context("Failed to delete stale embedding")?;
            }
        }

        for chunk in pending.chunks(INDEX_BATCH_SIZE) {
            let texts: Vec<String> = chunk.iter().map(|d| embedding_text(d)).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            let batch = self.to_batch(chunk, &embeddings)?;
            self.insert(batch).await?;
        }

        Ok(pending.len())
    }

    async fn row_state(&self, key: &str, hash: &str) -> Result<RowState> {
        if !self.has_key(key).await? {
            return Ok(RowState::Missing);
        }
        let filter = format!("{} AND content_hash = '{}'", key_filter(key), hash);
        let table = self.open_table().await?;
        let current = table
            .count_rows(Some(filter))
            .await
            .context("Failed to count rows for content hash")?;
        Ok(if current > 0 {
            RowState::Current
        } else {
            RowState::Stale
        })
    }

    pub async fn count(&self) -> Result<usize> {
        if !self.table_exists().await? {
            return Ok(0);
        }
        let table = self.open_table().await?;
        table.count_rows(None).await.context("Failed to count rows")
    }

    pub async fn has_key(&self, key: &str) -> Result<bool> {
        if !self.table_exists().await? {
            return Ok(false);
        }
        let table = self.open_table().await?;
        let count = table
            .count_rows(Some(key_filter(key)))
            .await
            .context("Failed to count rows for key")?;
        Ok(count > 0)
    }
}

enum RowState {
    Missing,
    Current,
    Stale,
}

/// Hex SHA-256 of the text a document is embedded from
fn content_hash(doc: &Document) -> String {
    format!("{:x}", Sha256::digest(embedding_text(doc).as_bytes()))
}

/// SQL filter selecting one key; single quotes are doubled
fn key_filter(key: &str) -> String {
    format!("doc_key = '{}'", key.replace('\'', "''"))
}

#[async_trait]
impl SimilarityIndex for LanceIndex {
    async fn search(&self, query: &str, k: usize, fetch_k: usize) -> Result<Vec<Document>> {
        if k == 0 || !self.table_exists().await? {
            return Ok(vec![]);
        }

        let query_vector = self.embedder.embed_query(query).await?;

        let table = self.open_table().await?;
        let batches: Vec<RecordBatch> = table
            .vector_search(query_vector.clone())
            .context("Failed to create vector search")?
            .limit(fetch_k.max(k))
            .execute()
            .await
            .context("Failed to execute vector search")?
            .try_collect()
            .await?;

        let mut candidates: Vec<(usize, Vec<f32>)> = Vec::new();
        for batch in &batches {
            let keys = batch
                .column_by_name("doc_key")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow::anyhow!("Missing doc_key column"))?;
            let embeddings = batch
                .column_by_name("embedding")
                .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
                .ok_or_else(|| anyhow::anyhow!("Missing embedding column"))?;

            for row in 0..batch.num_rows() {
                // rows for documents no longer in the store are skipped
                let Some(&position) = self.positions.get(keys.value(row)) else {
                    continue;
                };
                let values = embeddings.value(row);
                let values = values
                    .as_any()
                    .downcast_ref::<Float32Array>()
                    .ok_or_else(|| anyhow::anyhow!("Embedding is not Float32"))?;
                candidates.push((position, values.values().to_vec()));
            }
        }

        let vectors: Vec<&[f32]> = candidates.iter().map(|(_, v)| v.as_slice()).collect();
        Ok(mmr_select(&query_vector, &vectors, k, self.lambda)
            .into_iter()
            .map(|c| self.documents[candidates[c].0].clone())
            .collect())
    }

    fn name(&self) -> &str {
        "lancedb"
    }
}

// ============================================================================
// Tests
// ============================================================================
