//! Boolean search over the whole knowledge base
//!
//! Full scan, no index and no ranking: matches come back in store order.

use std::sync::Arc;

use serde::Serialize;

use crate::knowledge::{Document, DocumentStore};

use super::eval::{extract_terms, DocumentTerms};
use super::parser::{parse, parse_strict, QueryError, QueryExpr};
use super::snippet::{generate_snippet, SnippetConfig};

/// One matching document
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// 1-based position among the matches
    pub ordinal: usize,
    pub title: String,
    pub source: String,
    pub snippet: String,
}

/// Boolean query engine over a document snapshot
pub struct SearchEngine {
    documents: Arc<[Document]>,
    snippet: SnippetConfig,
}

impl SearchEngine {
    pub fn new(store: &DocumentStore, snippet: SnippetConfig) -> Self {
        Self {
            documents: store.shared(),
            snippet,
        }
    }

    /// Runs a query and renders the matches for the chat layer.
    ///
    /// Malformed queries are parsed leniently; an empty query matches nothing.
    pub fn search(&self, query: &str) -> String {
        render(&self.matches(query))
    }

    /// Like [`SearchEngine::search`] but rejects malformed syntax
    pub fn search_strict(&self, query: &str) -> Result<String, QueryError> {
        let expr = parse_strict(query)?;
        Ok(render(&self.matches_expr(&expr)))
    }

    /// Structured matches for a query, in store order
    pub fn matches(&self, query: &str) -> Vec<SearchHit> {
        match parse(query) {
            Some(expr) => self.matches_expr(&expr),
            None => {
                tracing::warn!("Query {:?} produced no search terms", query);
                Vec::new()
            }
        }
    }

    /// Evaluates a parsed query against every document
    pub fn matches_expr(&self, expr: &QueryExpr) -> Vec<SearchHit> {
        let terms = extract_terms(expr);

        let hits: Vec<SearchHit> = self
            .documents
            .iter()
            .filter(|doc| expr.matches(&DocumentTerms::new(&doc.content)))
            .enumerate()
            .map(|(i, doc)| SearchHit {
                ordinal: i + 1,
                title: doc.title(),
                source: doc.source(),
                snippet: generate_snippet(&doc.content, &terms, &self.snippet),
            })
            .collect();

        tracing::info!("Found {} matching documents", hits.len());
        hits
    }
}

/// Result block format consumed by the answering prompt
fn render(hits: &[SearchHit]) -> String {
    let mut out = String::new();
    for hit in hits {
        out.push_str(&format!(
            "\n{}. {} (Source: {})\nSnippet: {}\n\n",
            hit.ordinal, hit.title, hit.source, hit.snippet
        ));
    }
    out
}
