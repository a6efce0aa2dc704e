//! Boolean query engine
//!
//! tokenizer → recursive-descent parser → evaluator → snippet generator.
//! Pure predicate matching over the full store; independent of the
//! ranked retrievers.

mod engine;
mod eval;
mod parser;
mod snippet;
mod tokenizer;

pub use engine::{SearchEngine, SearchHit};
pub use eval::{evaluate, extract_terms, DocumentTerms};
pub use parser::{
    parse, parse_strict, parse_tokens, Operator, QueryError, QueryExpr, MAX_NESTING,
};
pub use snippet::{find_snippets, generate_snippet, Snippet, SnippetConfig, FALLBACK_CHARS};
pub use tokenizer::tokenize;
