//! Fuzzy-Match Retriever - phonetic + textual similarity
//!
//! Transliterated names and devotional terms are spelled many ways
//! (`vishweshwara`, `viswesvara`), so edit distance alone is not enough.
//! Each document is scored by a blend of token overlap, partial textual
//! similarity and phonetic-set similarity, with a small boost from
//! descriptive metadata fields. All per-document features are computed
//! once at construction.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::knowledge::Document;

use super::phonetic;
use super::similarity::{partial_ratio, ratio, token_set_ratio, word_starts};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzyConfig {
    pub k: usize,
    pub content_weight: f64,
    pub metadata_weight: f64,
    /// Documents scoring at or below this (0–100) are dropped
    pub threshold: f64,
    /// Metadata keys compared against the query
    pub metadata_fields: Vec<String>,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            k: 5,
            content_weight: 0.9,
            metadata_weight: 0.1,
            threshold: 30.0,
            metadata_fields: vec![
                "title".to_string(),
                "summary".to_string(),
                "description".to_string(),
            ],
        }
    }
}

// ============================================================================
// Types
// ============================================================================

/// Score breakdown for one document
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyScore {
    /// Phonetic-set similarity against the content
    pub phonetic: f64,
    /// Share of query tokens present in the content
    pub overlap: f64,
    /// Best partial textual similarity against the content
    pub partial: f64,
    pub content: f64,
    pub metadata: f64,
    /// Weighted final score
    pub total: f64,
}

struct FieldFeatures {
    text: Vec<char>,
    phonetics: BTreeSet<String>,
}

struct DocumentFeatures {
    content: Vec<char>,
    word_starts: Vec<usize>,
    tokens: HashSet<String>,
    phonetics: BTreeSet<String>,
    fields: Vec<FieldFeatures>,
}

struct QueryFeatures {
    text: Vec<char>,
    tokens: HashSet<String>,
    phonetics: BTreeSet<String>,
}

// ============================================================================
// FuzzyMatchRetriever
// ============================================================================

pub struct FuzzyMatchRetriever {
    documents: Arc<[Document]>,
    features: Vec<DocumentFeatures>,
    config: FuzzyConfig,
}

impl FuzzyMatchRetriever {
    /// Builds the retriever and its per-document feature cache
    pub fn new(documents: Arc<[Document]>, config: FuzzyConfig) -> Self {
        let features = documents
            .iter()
            .map(|doc| DocumentFeatures::new(doc, &config.metadata_fields))
            .collect();

        tracing::debug!("Fuzzy feature cache built for {} documents", documents.len());

        Self {
            documents,
            features,
            config,
        }
    }

    pub fn config(&self) -> &FuzzyConfig {
        &self.config
    }

    /// Documents above the threshold with their scores, best first
    pub fn scored(&self, query: &str) -> Vec<(Document, FuzzyScore)> {
        let query = QueryFeatures::new(query);
        if query.tokens.is_empty() {
            return Vec::new();
        }

        let mut scores: Vec<(usize, FuzzyScore)> = self
            .features
            .iter()
            .enumerate()
            .map(|(i, features)| (i, self.score(&query, features)))
            .filter(|(_, score)| score.total > self.config.threshold)
            .collect();

        scores.sort_by(|(_, a), (_, b)| {
            b.phonetic
                .total_cmp(&a.phonetic)
                .then(b.overlap.total_cmp(&a.overlap))
                .then(b.total.total_cmp(&a.total))
        });
        scores.truncate(self.config.k);

        scores
            .into_iter()
            .map(|(i, score)| (self.documents[i].clone(), score))
            .collect()
    }

    pub fn retrieve(&self, query: &str) -> Vec<Document> {
        self.scored(query).into_iter().map(|(doc, _)| doc).collect()
    }

    fn score(&self, query: &QueryFeatures, doc: &DocumentFeatures) -> FuzzyScore {
        let shared = query.tokens.intersection(&doc.tokens).count();
        let overlap = 100.0 * shared as f64 / query.tokens.len() as f64;
        let partial = partial_ratio(&query.text, &doc.content, &doc.word_starts);
        let phonetic = token_set_ratio(&query.phonetics, &doc.phonetics);
        let content = (overlap + partial + phonetic) / 3.0;

        let metadata = doc
            .fields
            .iter()
            .map(|field| {
                ratio(&query.text, &field.text).max(token_set_ratio(&query.phonetics, &field.phonetics))
            })
            .fold(0.0, f64::max);

        FuzzyScore {
            phonetic,
            overlap,
            partial,
            content,
            metadata,
            total: self.config.content_weight * content + self.config.metadata_weight * metadata,
        }
    }
}

// ============================================================================
// Feature extraction
// ============================================================================

impl DocumentFeatures {
    fn new(doc: &Document, fields: &[String]) -> Self {
        let lower = doc.content.to_lowercase();
        let content: Vec<char> = lower.chars().collect();
        let tokens: HashSet<String> = words(&lower).map(str::to_string).collect();
        let phonetics = phonetic::encode_all(tokens.iter().map(String::as_str))
            .into_iter()
            .collect();

        let fields = fields
            .iter()
            .filter_map(|key| doc.meta_text(key))
            .map(|value| {
                let lower = value.to_lowercase();
                FieldFeatures {
                    phonetics: phonetic::encode_all(words(&lower)).into_iter().collect(),
                    text: lower.chars().collect(),
                }
            })
            .collect();

        Self {
            word_starts: word_starts(&content),
            content,
            tokens,
            phonetics,
            fields,
        }
    }
}

impl QueryFeatures {
    fn new(query: &str) -> Self {
        let lower = query.trim().to_lowercase();
        let tokens: HashSet<String> = words(&lower).map(str::to_string).collect();
        let phonetics = phonetic::encode_all(words(&lower)).into_iter().collect();

        Self {
            text: lower.chars().collect(),
            tokens,
            phonetics,
        }
    }
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\w+").expect("Invalid regex"))
        .find_iter(text)
        .map(|m| m.as_str())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Arc<[Document]> {
        vec![
            Document::new("Annual accounts of the samaj were presented at the meeting.")
                .with_meta("title", "Samaj Accounts"),
            Document::new("The Viswesvara temple at Benares was visited by the swamiji.")
                .with_meta("title", "Pilgrimage to Kashi"),
            Document::new("A recipe for mango pickle from our readers.")
                .with_meta("title", "Kitchen Corner"),
            Document::new("Notes on the Vishweshwara shrine and its history.")
                .with_meta("title", "Temple History")
                .with_meta("summary", "vishweshwara shrine"),
        ]
        .into()
    }

    fn titles(docs: &[Document]) -> Vec<String> {
        docs.iter().map(|d| d.title()).collect()
    }

    #[test]
    fn test_transliteration_variants_match() {
        let retriever = FuzzyMatchRetriever::new(corpus(), FuzzyConfig::default());
        let found = titles(&retriever.retrieve("vishweshwara"));
        assert!(found.contains(&"Pilgrimage to Kashi".to_string()), "{:?}", found);
        assert!(found.contains(&"Temple History".to_string()), "{:?}", found);
        assert!(!found.contains(&"Kitchen Corner".to_string()), "{:?}", found);
    }

    #[test]
    fn test_phonetic_dominates_ordering() {
        let retriever = FuzzyMatchRetriever::new(corpus(), FuzzyConfig::default());
        let scored = retriever.scored("viswesvara temple");
        assert!(!scored.is_empty());
        for pair in scored.windows(2) {
            let (a, b) = (&pair[0].1, &pair[1].1);
            assert!(
                a.phonetic > b.phonetic
                    || (a.phonetic == b.phonetic && a.overlap > b.overlap)
                    || (a.phonetic == b.phonetic && a.overlap == b.overlap && a.total >= b.total)
            );
        }
        assert_eq!(scored[0].0.title(), "Pilgrimage to Kashi");
    }

    #[test]
    fn test_threshold_and_k() {
        let strict = FuzzyConfig { threshold: 99.0, ..FuzzyConfig::default() };
        let retriever = FuzzyMatchRetriever::new(corpus(), strict);
        assert!(retriever.retrieve("pickle recipe").is_empty());

        let one = FuzzyConfig { k: 1, ..FuzzyConfig::default() };
        let retriever = FuzzyMatchRetriever::new(corpus(), one);
        assert!(retriever.retrieve("vishweshwara shrine").len() <= 1);
    }

    #[test]
    fn test_scores_are_bounded_and_weighted() {
        let config = FuzzyConfig::default();
        let retriever = FuzzyMatchRetriever::new(corpus(), config.clone());
        for (_, score) in retriever.scored("swamiji temple") {
            for part in [score.phonetic, score.overlap, score.partial, score.metadata] {
                assert!((0.0..=100.0).contains(&part));
            }
            let expected = config.content_weight * score.content + config.metadata_weight * score.metadata;
            assert!((score.total - expected).abs() < 1e-9);
            assert!(score.total > config.threshold);
        }
    }

    #[test]
    fn test_deterministic() {
        let retriever = FuzzyMatchRetriever::new(corpus(), FuzzyConfig::default());
        let first = retriever.scored("vishweshwara temple");
        let second = retriever.scored("vishweshwara temple");
        assert_eq!(first, second);

        let rebuilt = FuzzyMatchRetriever::new(corpus(), FuzzyConfig::default());
        assert_eq!(rebuilt.scored("vishweshwara temple"), first);
    }

    #[test]
    fn test_empty_query() {
        let retriever = FuzzyMatchRetriever::new(corpus(), FuzzyConfig::default());
        assert!(retriever.retrieve("").is_empty());
        assert!(retriever.retrieve("  ?! ").is_empty());
    }
}
