//! Exact-Match Retriever - literal term counting
//!
//! Scores each document by how often the query words occur, case-insensitively,
//! in its content and in its joined metadata values.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::knowledge::Document;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExactConfig {
    pub k: usize,
}

impl Default for ExactConfig {
    fn default() -> Self {
        Self { k: 5 }
    }
}

/// Substring-count retriever
pub struct ExactMatchRetriever {
    documents: Arc<[Document]>,
    /// lower-cased (content, metadata text) per document
    haystacks: Vec<(String, String)>,
    k: usize,
}

impl ExactMatchRetriever {
    pub fn new(documents: Arc<[Document]>, config: &ExactConfig) -> Self {
        let haystacks = documents
            .iter()
            .map(|d| (d.content.to_lowercase(), d.metadata_text().to_lowercase()))
            .collect();

        Self {
            documents,
            haystacks,
            k: config.k,
        }
    }

    /// Documents with a non-zero count, highest first (ties keep store order)
    pub fn scored(&self, query: &str) -> Vec<(Document, usize)> {
        let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if words.is_empty() {
            return Vec::new();
        }

        let mut counts: Vec<(usize, usize)> = self
            .haystacks
            .iter()
            .enumerate()
            .map(|(i, (content, meta))| {
                let total = words
                    .iter()
                    .map(|w| content.matches(w.as_str()).count() + meta.matches(w.as_str()).count())
                    .sum();
                (i, total)
            })
            .filter(|&(_, total)| total > 0)
            .collect();

        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(self.k);

        counts
            .into_iter()
            .map(|(i, total)| (self.documents[i].clone(), total))
            .collect()
    }

    pub fn retrieve(&self, query: &str) -> Vec<Document> {
        self.scored(query).into_iter().map(|(doc, _)| doc).collect()
    }
}
