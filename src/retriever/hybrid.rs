//! Hybrid Retriever - fan-out over independent strategies
//!
//! Every member retriever runs concurrently on the same query; their results
//! are concatenated in declared order. No re-ranking or deduplication happens
//! here: callers run [`crate::knowledge::dedupe`] when they need it.

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use super::exact::ExactMatchRetriever;
use super::fuzzy::FuzzyMatchRetriever;
use super::lexical::LexicalRetriever;
use super::vector::{SimilarityIndex, VectorRetriever};
use crate::config::Settings;
use crate::knowledge::{Document, DocumentStore};

// ============================================================================
// Retriever
// ============================================================================

/// Retrieval strategy, in factory order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum RetrieverKind {
    Exact,
    Fuzzy,
    Lexical,
    Vector,
}

impl RetrieverKind {
    pub const ALL: [RetrieverKind; 4] = [
        RetrieverKind::Exact,
        RetrieverKind::Fuzzy,
        RetrieverKind::Lexical,
        RetrieverKind::Vector,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RetrieverKind::Exact => "exact",
            RetrieverKind::Fuzzy => "fuzzy",
            RetrieverKind::Lexical => "lexical",
            RetrieverKind::Vector => "vector",
        }
    }
}

impl fmt::Display for RetrieverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retrieval strategy.
///
/// CPU-bound members are shared behind `Arc` so each query can run them on
/// the blocking pool.
#[derive(Clone)]
pub enum Retriever {
    Exact(Arc<ExactMatchRetriever>),
    Fuzzy(Arc<FuzzyMatchRetriever>),
    Lexical(Arc<LexicalRetriever>),
    Vector(VectorRetriever),
}

impl Retriever {
    pub fn kind(&self) -> RetrieverKind {
        match self {
            Retriever::Exact(_) => RetrieverKind::Exact,
            Retriever::Fuzzy(_) => RetrieverKind::Fuzzy,
            Retriever::Lexical(_) => RetrieverKind::Lexical,
            Retriever::Vector(_) => RetrieverKind::Vector,
        }
    }

    /// Runs the strategy; synchronous members execute on a blocking thread
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        let docs = match self {
            Retriever::Exact(r) => {
                let (r, q) = (Arc::clone(r), query.to_string());
                run_blocking(move || Ok(r.retrieve(&q))).await?
            }
            Retriever::Fuzzy(r) => {
                let (r, q) = (Arc::clone(r), query.to_string());
                run_blocking(move || Ok(r.retrieve(&q))).await?
            }
            Retriever::Lexical(r) => {
                let (r, q) = (Arc::clone(r), query.to_string());
                run_blocking(move || r.retrieve(&q)).await?
            }
            Retriever::Vector(r) => r.retrieve(query).await?,
        };
        tracing::debug!("{} retriever: {} docs for {:?}", self.kind(), docs.len(), query);
        Ok(docs)
    }
}

/// Moves CPU-bound work off the async worker threads
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("Retriever task panicked")?
}

// ============================================================================
// HybridRetriever
// ============================================================================

pub struct HybridRetriever {
    retrievers: Vec<Retriever>,
}

impl HybridRetriever {
    pub fn new(retrievers: Vec<Retriever>) -> Self {
        Self { retrievers }
    }

    /// Builds the retrievers enabled in `settings`, in exact → fuzzy →
    /// lexical → vector order.
    ///
    /// # Arguments
    /// * `store` - documents shared by every member
    /// * `settings` - per-retriever parameters and the enabled list
    /// * `vector_index` - required when the vector retriever is enabled
    pub fn from_settings(
        store: &DocumentStore,
        settings: &Settings,
        vector_index: Option<Arc<dyn SimilarityIndex>>,
    ) -> Result<Self> {
        let enabled = &settings.retrievers.enabled;
        let mut retrievers = Vec::new();

        for kind in RetrieverKind::ALL {
            if !enabled.contains(&kind) {
                continue;
            }
            let retriever = match kind {
                RetrieverKind::Exact => {
                    Retriever::Exact(Arc::new(ExactMatchRetriever::new(
                        store.shared(),
                        &settings.exact,
                    )))
                }
                RetrieverKind::Fuzzy => Retriever::Fuzzy(Arc::new(FuzzyMatchRetriever::new(
                    store.shared(),
                    settings.fuzzy.clone(),
                ))),
                RetrieverKind::Lexical => {
                    Retriever::Lexical(Arc::new(LexicalRetriever::new(
                        store.shared(),
                        &settings.lexical,
                    )?))
                }
                RetrieverKind::Vector => {
                    let index = vector_index.clone().ok_or_else(|| {
                        anyhow::anyhow!("Vector retriever enabled but no similarity index provided")
                    })?;
                    Retriever::Vector(VectorRetriever::new(index, &settings.vector))
                }
            };
            retrievers.push(retriever);
        }

        if retrievers.is_empty() {
            tracing::warn!("No retrievers enabled; hybrid retrieval will return nothing");
        }
        Ok(Self::new(retrievers))
    }

    pub fn kinds(&self) -> Vec<RetrieverKind> {
        self.retrievers.iter().map(Retriever::kind).collect()
    }

    /// All members concurrently; results concatenated in member order.
    ///
    /// Exact, fuzzy and lexical members run in parallel on tokio's blocking
    /// pool, so a runtime must be active. The first member failure fails the
    /// whole call.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        let results = try_join_all(self.retrievers.iter().map(|r| r.retrieve(query))).await?;
        Ok(results.into_iter().flatten().collect())
    }

    /// One concatenated result list per query.
    ///
    /// Every (query, member) pair is its own blocking task, so independent
    /// queries proceed in parallel on a multi-thread runtime.
    pub async fn retrieve_batch(&self, queries: &[String]) -> Result<Vec<Vec<Document>>> {
        try_join_all(queries.iter().map(|q| self.retrieve(q))).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retriever::{EmbeddingIndex, ExactConfig};
    use crate::embedding::HashingEmbedding;

    fn store() -> DocumentStore {
        DocumentStore::from_documents(vec![
            Document::new("The swamiji visited the temple at Shirali.")
                .with_meta("source", "a.pdf")
                .with_meta("title", "Visit"),
            Document::new("The Viswesvara temple at Benares.")
                .with_meta("source", "a.pdf")
                .with_meta("title", "Benares"),
            Document::new("A recipe for mango pickle.")
                .with_meta("source", "b.pdf")
                .with_meta("title", "Kitchen"),
        ])
    }

    fn settings(enabled: &[RetrieverKind]) -> Settings {
        let mut settings = Settings::default();
        settings.retrievers.enabled = enabled.to_vec();
        settings
    }

    #[tokio::test]
    async fn test_concatenates_in_declared_order() {
        let store = store();
        let exact = ExactMatchRetriever::new(store.shared(), &ExactConfig::default());
        let expected_exact = exact.retrieve("temple");

        let hybrid =
            HybridRetriever::from_settings(&store, &settings(&RetrieverKind::ALL[..3]), None)
                .unwrap();
        assert_eq!(
            hybrid.kinds(),
            vec![RetrieverKind::Exact, RetrieverKind::Fuzzy, RetrieverKind::Lexical]
        );

        let results = hybrid.retrieve("temple").await.unwrap();
        assert_eq!(&results[..expected_exact.len()], expected_exact.as_slice());
        // no dedup across members
        assert!(results.len() > expected_exact.len());
    }

    #[tokio::test]
    async fn test_factory_order_ignores_config_order() {
        let hybrid = HybridRetriever::from_settings(
            &store(),
            &settings(&[RetrieverKind::Lexical, RetrieverKind::Exact]),
            None,
        )
        .unwrap();
        assert_eq!(hybrid.kinds(), vec![RetrieverKind::Exact, RetrieverKind::Lexical]);
    }

    #[tokio::test]
    async fn test_vector_requires_index() {
        let result =
            HybridRetriever::from_settings(&store(), &settings(&[RetrieverKind::Vector]), None);
        assert!(result.is_err());

        let store = store();
        let index = EmbeddingIndex::build(
            Arc::new(HashingEmbedding::new(64).unwrap()),
            store.shared(),
            0.5,
        )
        .await
        .unwrap();
        let hybrid = HybridRetriever::from_settings(
            &store,
            &settings(&[RetrieverKind::Vector]),
            Some(Arc::new(index)),
        )
        .unwrap();
        assert!(!hybrid.retrieve("temple").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_is_per_query() {
        let hybrid =
            HybridRetriever::from_settings(&store(), &settings(&[RetrieverKind::Exact]), None)
                .unwrap();
        let batches = hybrid
            .retrieve_batch(&["pickle".to_string(), "shirali".to_string(), "".to_string()])
            .await
            .unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0][0].title(), "Kitchen");
        assert_eq!(batches[1][0].title(), "Visit");
        assert!(batches[2].is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_cpu_bound_work_leaves_the_async_thread() {
        let caller = std::thread::current().id();
        let worker = run_blocking(|| Ok(std::thread::current().id())).await.unwrap();
        assert_ne!(caller, worker);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_batch_matches_individual_queries() {
        let hybrid =
            HybridRetriever::from_settings(&store(), &settings(&RetrieverKind::ALL[..3]), None)
                .unwrap();
        let queries: Vec<String> = ["temple", "viswesvara", "pickle", "shirali"]
            .iter()
            .map(|q| q.to_string())
            .collect();

        let batch = hybrid.retrieve_batch(&queries).await.unwrap();
        for (query, result) in queries.iter().zip(&batch) {
            assert_eq!(result, &hybrid.retrieve(query).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_blocking_errors_propagate() {
        let result = run_blocking::<Vec<Document>, _>(|| anyhow::bail!("fts unavailable")).await;
        assert!(format!("{:#}", result.unwrap_err()).contains("fts unavailable"));
    }

    #[tokio::test]
    async fn test_no_retrievers_returns_empty() {
        let hybrid = HybridRetriever::new(vec![]);
        assert!(hybrid.retrieve("temple").await.unwrap().is_empty());
    }
}
