//! Query evaluation and term extraction
//!
//! A leaf matches when its lower-cased text equals one of the document's
//! whitespace-separated words, either as written or with surrounding
//! punctuation trimmed (`mandir.` also counts as `mandir`). Substrings never
//! match. Both operands of every node are always evaluated. Trees are walked
//! with an explicit stack.

use std::collections::HashSet;

use crate::knowledge::Document;

use super::parser::{Operator, QueryExpr};

/// Lower-cased whitespace word set of a document's content
#[derive(Debug, Clone, Default)]
pub struct DocumentTerms {
    words: HashSet<String>,
}

impl DocumentTerms {
    pub fn new(content: &str) -> Self {
        let mut words = HashSet::new();
        for word in content.to_lowercase().split_whitespace() {
            let trimmed = word.trim_matches(|c: char| !c.is_alphanumeric());
            if !trimmed.is_empty() && trimmed != word {
                words.insert(trimmed.to_string());
            }
            words.insert(word.to_string());
        }
        Self { words }
    }

    pub fn contains(&self, term: &str) -> bool {
        self.words.contains(&term.to_lowercase())
    }
}

enum Frame<'a> {
    Visit(&'a QueryExpr),
    Apply(Operator),
}

impl QueryExpr {
    /// Evaluates the tree against a pre-computed word set
    pub fn matches(&self, terms: &DocumentTerms) -> bool {
        let mut stack = vec![Frame::Visit(self)];
        let mut values: Vec<bool> = Vec::new();

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Visit(QueryExpr::Term(term)) => values.push(terms.contains(term)),
                Frame::Visit(QueryExpr::Binary { op, left, right }) => {
                    stack.push(Frame::Apply(*op));
                    stack.push(Frame::Visit(right));
                    stack.push(Frame::Visit(left));
                }
                Frame::Apply(op) => {
                    let right = values.pop().unwrap_or(false);
                    let left = values.pop().unwrap_or(false);
                    values.push(op.apply(left, right));
                }
            }
        }

        values.pop().unwrap_or(false)
    }
}

/// Evaluates a parsed query against one document
pub fn evaluate(expr: &QueryExpr, doc: &Document) -> bool {
    expr.matches(&DocumentTerms::new(&doc.content))
}

/// Lower-cased leaf terms, depth-first, left to right
pub fn extract_terms(expr: &QueryExpr) -> Vec<String> {
    let mut terms = Vec::new();
    let mut stack = vec![expr];

    while let Some(node) = stack.pop() {
        match node {
            QueryExpr::Term(term) => terms.push(term.to_lowercase()),
            QueryExpr::Binary { left, right, .. } => {
                stack.push(right);
                stack.push(left);
            }
        }
    }

    terms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::parse;

    fn t(s: &str) -> QueryExpr {
        QueryExpr::term(s)
    }

    fn temple_doc() -> Document {
        Document::new("The Vishweshwara temple in Benares is a famous Hindu mandir.")
            .with_meta("title", "Temples of India")
            .with_meta("source", "test")
    }

    #[test]
    fn test_evaluate_leaf() {
        let doc = temple_doc();
        assert!(evaluate(&t("temple"), &doc));
        assert!(!evaluate(&t("mosque"), &doc));
    }

    #[test]
    fn test_evaluate_and_or() {
        let doc = temple_doc();
        assert!(evaluate(&QueryExpr::and(t("temple"), t("benares")), &doc));
        assert!(!evaluate(&QueryExpr::and(t("temple"), t("mosque")), &doc));
        assert!(evaluate(&QueryExpr::or(t("temple"), t("mosque")), &doc));
        assert!(!evaluate(&QueryExpr::or(t("church"), t("mosque")), &doc));
    }

    #[test]
    fn test_evaluate_whole_word_only() {
        let doc = temple_doc();
        assert!(evaluate(&t("mandir"), &doc));
        assert!(evaluate(&t("mandir."), &doc));
        assert!(evaluate(&QueryExpr::and(t("temple"), t("mandir")), &doc));
        assert!(!evaluate(&t("temp"), &doc));
        assert!(!evaluate(&t("mand"), &doc));
    }

    #[test]
    fn test_evaluate_case_insensitive_nested() {
        let doc = temple_doc();
        let nested = QueryExpr::and(
            QueryExpr::or(t("temple"), t("mandir")),
            QueryExpr::or(t("Vishweshwara"), t("Viswesvara")),
        );
        assert!(evaluate(&nested, &doc));
    }

    #[test]
    fn test_evaluate_long_chain() {
        let terms: Vec<String> = (0..5000).map(|i| format!("w{}", i)).collect();
        let query = format!("{} OR temple", terms.join(" OR "));
        let expr = parse(&query).unwrap();
        assert!(evaluate(&expr, &temple_doc()));
    }

    #[test]
    fn test_extract_terms_order() {
        let expr = parse("((Swami AND anandashram) OR (swami AND parijnanashram)) AND (teachings OR discourse)")
            .unwrap();
        assert_eq!(
            extract_terms(&expr),
            vec!["swami", "anandashram", "swami", "parijnanashram", "teachings", "discourse"]
        );
    }
}
