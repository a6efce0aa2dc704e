//! Lexical Ranking Retriever - BM25 over SQLite FTS5
//!
//! Documents are loaded into an in-memory FTS5 table once; queries are
//! OR-joined bare words ranked by the built-in `bm25()` function.
//! source: https://www.sqlite.org/fts5.html#the_bm25_function

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::knowledge::Document;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalConfig {
    pub k: usize,
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self { k: 5 }
    }
}

/// BM25 retriever backed by an in-memory FTS5 index
pub struct LexicalRetriever {
    conn: Arc<Mutex<Connection>>,
    documents: Arc<[Document]>,
    k: usize,
}

impl LexicalRetriever {
    /// Builds the FTS5 index; rowid is the store position + 1
    pub fn new(documents: Arc<[Document]>, config: &LexicalConfig) -> Result<Self> {
        let mut conn = Connection::open_in_memory().context("Failed to open in-memory SQLite")?;

        conn.execute(
            "CREATE VIRTUAL TABLE articles USING fts5(title, content)",
            [],
        )
        .context("Failed to create FTS5 table")?;

        {
            let tx = conn.transaction()?;
            {
                let mut stmt =
                    tx.prepare("INSERT INTO articles(rowid, title, content) VALUES (?1, ?2, ?3)")?;
                for (i, doc) in documents.iter().enumerate() {
                    stmt.execute(params![(i + 1) as i64, doc.title(), doc.content])
                        .context("Failed to index document")?;
                }
            }
            tx.commit().context("Failed to commit FTS5 index")?;
        }

        tracing::debug!("FTS5 index built with {} documents", documents.len());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            documents,
            k: config.k,
        })
    }

    /// Top-k documents with their BM25 relevance (higher is better)
    pub fn scored(&self, query: &str) -> Result<Vec<(Document, f64)>> {
        let expression = match_expression(query);
        if expression.is_empty() {
            return Ok(vec![]);
        }

        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let mut stmt = conn.prepare(
            r#"
            SELECT rowid, bm25(articles)
            FROM articles
            WHERE articles MATCH ?1
            ORDER BY bm25(articles), rowid
            LIMIT ?2
            "#,
        )?;

        let rows = stmt
            .query_map(params![expression, self.k as i64], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("FTS5 query failed")?;

        Ok(rows
            .into_iter()
            .filter_map(|(rowid, bm25)| {
                let doc = self.documents.get((rowid - 1) as usize)?;
                // FTS5 bm25() is negative; flip so higher means more relevant
                Some((doc.clone(), -bm25))
            })
            .collect())
    }

    pub fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        Ok(self.scored(query)?.into_iter().map(|(doc, _)| doc).collect())
    }
}

/// FTS5 MATCH expression: quoted bare words joined with OR.
///
/// Punctuation is stripped so user input can never form FTS5 syntax.
fn match_expression(query: &str) -> String {
    query
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric() || *c == '_')
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .map(|w| format!("\"{}\"", w))
        .collect::<Vec<_>>()
        .join(" OR ")
}
