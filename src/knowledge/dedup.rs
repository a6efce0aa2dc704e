//! Deduplicator - removes repeated documents from merged result sets
//!
//! Identity here is `(content, rendered metadata)`, not the store key.

use std::collections::HashSet;

use super::document::Document;

/// Removes duplicates, keeping the first occurrence of each document
pub fn dedupe(docs: Vec<Document>) -> Vec<Document> {
    let before = docs.len();
    let mut seen = HashSet::with_capacity(before);

    let unique: Vec<Document> = docs
        .into_iter()
        .filter(|doc| seen.insert(doc.dedup_identity()))
        .collect();

    tracing::info!("deduplicated {} docs to {} docs", before, unique.len());
    unique
}

/// Flattens per-query result lists, then deduplicates
pub fn dedupe_batches(batches: Vec<Vec<Document>>) -> Vec<Document> {
    dedupe(batches.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(content: &str, title: &str) -> Document {
        Document::new(content).with_meta("title", title)
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence_order() {
        let docs = vec![doc("b", "B"), doc("a", "A"), doc("b", "B"), doc("c", "C"), doc("a", "A")];
        let out = dedupe(docs);
        let contents: Vec<&str> = out.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_same_content_different_metadata_kept() {
        let out = dedupe(vec![doc("x", "One"), doc("x", "Two")]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_dedupe_batches_flattens() {
        let out = dedupe_batches(vec![
            vec![doc("a", "A"), doc("b", "B")],
            vec![doc("b", "B"), doc("c", "C")],
            vec![],
        ]);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_dedupe_empty() {
        assert!(dedupe(vec![]).is_empty());
    }
}
