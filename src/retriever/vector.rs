//! Vector Retriever - dense similarity search
//!
//! [`SimilarityIndex`] is the contract for any embedding-backed index.
//! [`EmbeddingIndex`] keeps vectors in memory; [`super::lance::LanceIndex`]
//! persists them in LanceDB. Both over-fetch `fetch_k` candidates by cosine
//! similarity and re-select `k` with maximal marginal relevance.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::lance::LanceIndex;
use crate::embedding::{create_embedder, EmbeddingProvider, ProviderKind, DEFAULT_DIMENSION};
use crate::knowledge::{get_data_dir, Document};

/// Default LanceDB directory name inside the data directory
pub const LANCE_DIR: &str = "articles.lance";

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Memory,
    Lance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    pub k: usize,
    pub fetch_k: usize,
    /// MMR trade-off: 1.0 is pure relevance, 0.0 pure diversity
    pub lambda_mult: f32,
    /// Unset: LanceDB for remote providers, memory for local ones
    pub backend: Option<IndexBackend>,
    pub provider: ProviderKind,
    pub dimension: usize,
    /// LanceDB directory; defaults to `articles.lance` in [`get_data_dir`]
    pub lance_path: Option<PathBuf>,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            k: 5,
            fetch_k: 20,
            lambda_mult: 0.5,
            backend: None,
            provider: ProviderKind::default(),
            dimension: DEFAULT_DIMENSION,
            lance_path: None,
        }
    }
}

impl VectorConfig {
    /// Backend to use; remote embeddings are persisted so they are paid once
    pub fn backend(&self) -> IndexBackend {
        self.backend.unwrap_or(match self.provider {
            ProviderKind::Gemini => IndexBackend::Lance,
            ProviderKind::Hashing => IndexBackend::Memory,
        })
    }

    pub fn lance_path(&self) -> PathBuf {
        self.lance_path
            .clone()
            .unwrap_or_else(|| get_data_dir().join(LANCE_DIR))
    }
}

// ============================================================================
// SimilarityIndex Trait
// ============================================================================

/// Externally provided similarity search over the same documents
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Up to `k` documents, selected from `fetch_k` nearest candidates
    async fn search(&self, query: &str, k: usize, fetch_k: usize) -> Result<Vec<Document>>;

    fn name(&self) -> &str;
}

/// Opens the configured index and embeds the documents it is missing
pub async fn open_index(
    config: &VectorConfig,
    documents: Arc<[Document]>,
) -> Result<Arc<dyn SimilarityIndex>> {
    let embedder = create_embedder(config.provider, config.dimension)?;

    let backend = config.backend();
    if backend == IndexBackend::Memory && config.provider == ProviderKind::Gemini {
        tracing::warn!(
            "In-memory index with Gemini embeddings re-embeds all {} documents on every run",
            documents.len()
        );
    }

    let index: Arc<dyn SimilarityIndex> = match backend {
        IndexBackend::Memory => Arc::new(
            EmbeddingIndex::build(embedder, documents, config.lambda_mult).await?,
        ),
        IndexBackend::Lance => {
            let index =
                LanceIndex::open(&config.lance_path(), embedder, documents, config.lambda_mult)
                    .await?;
            let added = index.index_documents().await?;
            tracing::info!("LanceDB index ready ({} new embeddings)", added);
            Arc::new(index)
        }
    };
    Ok(index)
}

// ============================================================================
// VectorRetriever
// ============================================================================

/// Delegates to a [`SimilarityIndex`]
#[derive(Clone)]
pub struct VectorRetriever {
    index: Arc<dyn SimilarityIndex>,
    k: usize,
    fetch_k: usize,
}

impl VectorRetriever {
    pub fn new(index: Arc<dyn SimilarityIndex>, config: &VectorConfig) -> Self {
        Self {
            index,
            k: config.k,
            fetch_k: config.fetch_k,
        }
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        if query.trim().is_empty() {
            return Ok(vec![]);
        }
        self.index
            .search(query, self.k, self.fetch_k.max(self.k))
            .await
            .with_context(|| format!("Vector search failed ({})", self.index.name()))
    }
}

// ============================================================================
// EmbeddingIndex
// ============================================================================

/// In-memory index: one embedding per document
pub struct EmbeddingIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    documents: Arc<[Document]>,
    vectors: Vec<Vec<f32>>,
    lambda: f32,
}

impl EmbeddingIndex {
    /// Embeds every document once
    pub async fn build(
        embedder: Arc<dyn EmbeddingProvider>,
        documents: Arc<[Document]>,
        lambda: f32,
    ) -> Result<Self> {
        let texts: Vec<String> = documents.iter().map(embedding_text).collect();
        let vectors = embedder
            .embed_batch(&texts)
            .await
            .context("Failed to embed documents")?;

        if vectors.len() != documents.len() {
            anyhow::bail!(
                "Embedding provider returned {} vectors for {} documents",
                vectors.len(),
                documents.len()
            );
        }

        tracing::info!(
            "Embedded {} documents with {}",
            documents.len(),
            embedder.name()
        );

        Ok(Self {
            embedder,
            documents,
            vectors,
            lambda,
        })
    }
}

#[async_trait]
impl SimilarityIndex for EmbeddingIndex {
    async fn search(&self, query: &str, k: usize, fetch_k: usize) -> Result<Vec<Document>> {
        if k == 0 || self.documents.is_empty() {
            return Ok(vec![]);
        }
        let query_vector = self.embedder.embed_query(query).await?;

        let mut ranked: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(&query_vector, v)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(fetch_k.max(k));

        let candidates: Vec<&[f32]> = ranked
            .iter()
            .map(|(i, _)| self.vectors[*i].as_slice())
            .collect();

        Ok(mmr_select(&query_vector, &candidates, k, self.lambda)
            .into_iter()
            .map(|c| self.documents[ranked[c].0].clone())
            .collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Text embedded for a document: title line followed by the content
pub fn embedding_text(doc: &Document) -> String {
    format!("{}\n{}", doc.title(), doc.content)
}

/// Cosine similarity in -1.0 ..= 1.0; 0.0 for mismatched or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Maximal marginal relevance selection.
///
/// Greedily picks the candidate maximising
/// `lambda * sim(query, c) - (1 - lambda) * max(sim(c, selected))`.
/// Ties go to the earlier candidate.
///
/// # Returns
/// Indices into `candidates`, in selection order
pub fn mmr_select<V: AsRef<[f32]>>(
    query: &[f32],
    candidates: &[V],
    k: usize,
    lambda: f32,
) -> Vec<usize> {
    let relevance: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(query, c.as_ref()))
        .collect();

    let mut selected: Vec<usize> = Vec::with_capacity(k.min(candidates.len()));
    let mut redundancy = vec![f32::NEG_INFINITY; candidates.len()];

    while selected.len() < k.min(candidates.len()) {
        let mut best: Option<(usize, f32)> = None;
        for i in 0..candidates.len() {
            if selected.contains(&i) {
                continue;
            }
            let penalty = if selected.is_empty() { 0.0 } else { redundancy[i] };
            let score = lambda * relevance[i] - (1.0 - lambda) * penalty;
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((i, score));
            }
        }

        let Some((pick, _)) = best else { break };
        selected.push(pick);

        for i in 0..candidates.len() {
            let sim = cosine_similarity(candidates[pick].as_ref(), candidates[i].as_ref());
            redundancy[i] = redundancy[i].max(sim);
        }
    }

    selected
}

// ============================================================================
// Tests
// ============================================================================
