//! Boolean query parser
//!
//! Recursive descent over the token list with an explicit index cursor.
//! Grouping is controlled only by parentheses: within one level operators
//! bind strictly left to right with no precedence, so `A OR B AND C` is
//! `((A OR B) AND C)`.
//!
//! [`parse`] is lenient: unbalanced parentheses, dangling operators and
//! adjacent terms never fail, the parser keeps whatever tree it has built.
//! [`parse_strict`] is the opt-in validating variant.

use std::fmt;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use thiserror::Error;

use super::tokenizer::tokenize;

/// Maximum parenthesis nesting followed by the parser
pub const MAX_NESTING: usize = 64;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    And,
    Or,
}

impl Operator {
    /// Operators are recognised only in upper case; `and` is a search term.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "AND" => Some(Operator::And),
            "OR" => Some(Operator::Or),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
        }
    }

    pub fn apply(self, left: bool, right: bool) -> bool {
        match self {
            Operator::And => left && right,
            Operator::Or => left || right,
        }
    }
}

/// Parsed boolean query
///
/// Serializes as `"term"` or `{"AND": [left, right]}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryExpr {
    Term(String),
    Binary {
        op: Operator,
        left: Box<QueryExpr>,
        right: Box<QueryExpr>,
    },
}

impl QueryExpr {
    pub fn term(term: impl Into<String>) -> Self {
        QueryExpr::Term(term.into())
    }

    pub fn binary(op: Operator, left: QueryExpr, right: QueryExpr) -> Self {
        QueryExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(left: QueryExpr, right: QueryExpr) -> Self {
        Self::binary(Operator::And, left, right)
    }

    pub fn or(left: QueryExpr, right: QueryExpr) -> Self {
        Self::binary(Operator::Or, left, right)
    }
}

impl Serialize for QueryExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            QueryExpr::Term(term) => serializer.serialize_str(term),
            QueryExpr::Binary { op, left, right } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(op.as_str(), &[left.as_ref(), right.as_ref()])?;
                map.end()
            }
        }
    }
}

impl fmt::Display for QueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryExpr::Term(term) => write!(f, "'{}'", term),
            QueryExpr::Binary { op, left, right } => {
                write!(f, "{{'{}': [{}, {}]}}", op.as_str(), left, right)
            }
        }
    }
}

/// Rejections raised by [`parse_strict`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("query is empty")]
    Empty,

    #[error("unexpected ')' at token {position}")]
    UnexpectedClose { position: usize },

    #[error("{count} unclosed '('")]
    Unclosed { count: usize },

    #[error("operator {operator} at token {position} has no operand")]
    DanglingOperator { operator: String, position: usize },

    #[error("missing operator before '{term}' at token {position}")]
    MissingOperator { term: String, position: usize },

    #[error("empty group at token {position}")]
    EmptyGroup { position: usize },

    #[error("parentheses nested deeper than {max}")]
    TooDeep { max: usize },
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses a query leniently; `None` when nothing usable was found.
///
/// An empty group contributes no operand, so the operator before it stays
/// pending and `a AND ()` parses as `a` rather than a never-matching AND.
/// Use [`parse_strict`] to reject such input.
pub fn parse(query: &str) -> Option<QueryExpr> {
    parse_tokens(&tokenize(query))
}

/// Parses an already tokenized query leniently
pub fn parse_tokens(tokens: &[String]) -> Option<QueryExpr> {
    Parser { tokens }.parse_expression(0, 0).0
}

/// Parses a query, rejecting malformed syntax instead of degrading
pub fn parse_strict(query: &str) -> Result<QueryExpr, QueryError> {
    let tokens = tokenize(query);
    validate(&tokens)?;
    parse_tokens(&tokens).ok_or(QueryError::Empty)
}

struct Parser<'a> {
    tokens: &'a [String],
}

impl Parser<'_> {
    /// Parses from `start` until the closing `)` of this level or the end.
    ///
    /// # Returns
    /// The expression built at this level and the index just past it
    fn parse_expression(&self, start: usize, depth: usize) -> (Option<QueryExpr>, usize) {
        let mut result: Option<QueryExpr> = None;
        let mut pending: Option<Operator> = None;
        let mut i = start;

        while i < self.tokens.len() {
            let token = self.tokens[i].as_str();

            match token {
                "(" => {
                    if depth >= MAX_NESTING {
                        tracing::warn!("Query nesting exceeds {}, ignoring the rest", MAX_NESTING);
                        return (result, self.tokens.len());
                    }
                    let (sub, next) = self.parse_expression(i + 1, depth + 1);
                    if let Some(sub) = sub {
                        result = combine(result, &mut pending, sub);
                    }
                    i = next;
                    continue;
                }
                ")" => return (result, i + 1),
                _ => match Operator::from_token(token) {
                    Some(op) => pending = Some(op),
                    None => result = combine(result, &mut pending, QueryExpr::term(token)),
                },
            }

            i += 1;
        }

        (result, i)
    }
}

/// Folds a new operand into the accumulated result.
///
/// The first operand becomes the result as-is; later operands need a
/// pending operator and are dropped without one.
fn combine(
    result: Option<QueryExpr>,
    pending: &mut Option<Operator>,
    operand: QueryExpr,
) -> Option<QueryExpr> {
    match result {
        None => Some(operand),
        Some(prev) => match pending.take() {
            Some(op) => Some(QueryExpr::binary(op, prev, operand)),
            None => Some(prev),
        },
    }
}

/// Syntax check used by [`parse_strict`]
fn validate(tokens: &[String]) -> Result<(), QueryError> {
    if tokens.is_empty() {
        return Err(QueryError::Empty);
    }

    let mut depth = 0usize;
    let mut expect_operand = true;
    let mut last_operator: Option<(&str, usize)> = None;

    for (position, token) in tokens.iter().enumerate() {
        let token = token.as_str();
        match token {
            "(" => {
                if !expect_operand {
                    return Err(QueryError::MissingOperator {
                        term: token.to_string(),
                        position,
                    });
                }
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(QueryError::TooDeep { max: MAX_NESTING });
                }
            }
            ")" => {
                if depth == 0 {
                    return Err(QueryError::UnexpectedClose { position });
                }
                if position > 0 && tokens[position - 1] == "(" {
                    return Err(QueryError::EmptyGroup { position: position - 1 });
                }
                if expect_operand {
                    let (operator, position) = last_operator.unwrap_or(("", position));
                    return Err(QueryError::DanglingOperator {
                        operator: operator.to_string(),
                        position,
                    });
                }
                depth -= 1;
            }
            _ if Operator::from_token(token).is_some() => {
                if expect_operand {
                    return Err(QueryError::DanglingOperator {
                        operator: token.to_string(),
                        position,
                    });
                }
                last_operator = Some((token, position));
                expect_operand = true;
            }
            _ => {
                if !expect_operand {
                    return Err(QueryError::MissingOperator {
                        term: token.to_string(),
                        position,
                    });
                }
                expect_operand = false;
            }
        }
    }

    if depth > 0 {
        return Err(QueryError::Unclosed { count: depth });
    }
    if expect_operand {
        let (operator, position) = last_operator.unwrap_or(("", tokens.len()));
        return Err(QueryError::DanglingOperator {
            operator: operator.to_string(),
            position,
        });
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
