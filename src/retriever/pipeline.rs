//! Retrieval pipeline - batch retrieval, dedup, relevance filter
//!
//! The relevance filter is an external collaborator (typically an LLM that
//! drops or compresses documents against instructions); only its seam lives
//! here.

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::hybrid::HybridRetriever;
use crate::knowledge::{dedupe_batches, Document};

/// Post-retrieval filter over the deduplicated documents
#[async_trait]
pub trait RelevanceFilter: Send + Sync {
    async fn filter(&self, docs: Vec<Document>, instructions: &str) -> Result<Vec<Document>>;
}

pub struct RetrievalPipeline {
    hybrid: HybridRetriever,
    filter: Option<Box<dyn RelevanceFilter>>,
}

impl RetrievalPipeline {
    pub fn new(hybrid: HybridRetriever) -> Self {
        Self {
            hybrid,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: Box<dyn RelevanceFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn hybrid(&self) -> &HybridRetriever {
        &self.hybrid
    }

    /// Retrieves every query, deduplicates the union, then filters it.
    ///
    /// # Arguments
    /// * `queries` - reformulated search queries
    /// * `instructions` - passed through to the relevance filter
    pub async fn run(&self, queries: &[String], instructions: &str) -> Result<Vec<Document>> {
        let batches = self.hybrid.retrieve_batch(queries).await?;
        let docs = dedupe_batches(batches);

        match &self.filter {
            Some(filter) => {
                let before = docs.len();
                let kept = filter
                    .filter(docs, instructions)
                    .await
                    .context("Relevance filter failed")?;
                tracing::info!("Relevance filter kept {} of {} docs", kept.len(), before);
                Ok(kept)
            }
            None => Ok(docs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::knowledge::DocumentStore;
    use crate::retriever::RetrieverKind;

    struct TitleFilter;

    #[async_trait]
    impl RelevanceFilter for TitleFilter {
        async fn filter(&self, docs: Vec<Document>, instructions: &str) -> Result<Vec<Document>> {
            Ok(docs
                .into_iter()
                .filter(|d| d.title().contains(instructions))
                .collect())
        }
    }

    struct BrokenFilter;

    #[async_trait]
    impl RelevanceFilter for BrokenFilter {
        async fn filter(&self, _: Vec<Document>, _: &str) -> Result<Vec<Document>> {
            anyhow::bail!("model unavailable")
        }
    }

    fn hybrid() -> HybridRetriever {
        let store = DocumentStore::from_documents(vec![
            Document::new("temple festival at shirali").with_meta("title", "Festival"),
            Document::new("temple bells and festival lamps").with_meta("title", "Bells"),
        ]);
        let mut settings = Settings::default();
        settings.retrievers.enabled = vec![RetrieverKind::Exact];
        HybridRetriever::from_settings(&store, &settings, None).unwrap()
    }

    fn queries() -> Vec<String> {
        vec!["temple".to_string(), "festival".to_string()]
    }

    #[tokio::test]
    async fn test_run_dedupes_across_queries() {
        let pipeline = RetrievalPipeline::new(hybrid());
        let docs = pipeline.run(&queries(), "").await.unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn test_run_applies_filter() {
        let pipeline = RetrievalPipeline::new(hybrid()).with_filter(Box::new(TitleFilter));
        let docs = pipeline.run(&queries(), "Bells").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title(), "Bells");
    }

    #[tokio::test]
    async fn test_filter_errors_propagate() {
        let pipeline = RetrievalPipeline::new(hybrid()).with_filter(Box::new(BrokenFilter));
        let err = pipeline.run(&queries(), "").await.unwrap_err();
        assert!(format!("{:#}", err).contains("model unavailable"));
    }
}
