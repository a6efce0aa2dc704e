//! Query tokenizer
//!
//! Splits a boolean query into terms, `AND`, `OR`, `(` and `)`.

/// Tokenizes a boolean query.
///
/// Parentheses become standalone tokens even when glued to a term
/// (`(temple` → `(`, `temple`); everything else splits on whitespace.
pub fn tokenize(query: &str) -> Vec<String> {
    let mut spaced = String::with_capacity(query.len() + 8);
    for c in query.chars() {
        match c {
            '(' | ')' => {
                spaced.push(' ');
                spaced.push(c);
                spaced.push(' ');
            }
            _ => spaced.push(c),
        }
    }

    spaced.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_nested() {
        assert_eq!(
            tokenize("(a OR b) AND c"),
            vec!["(", "a", "OR", "b", ")", "AND", "c"]
        );
    }

    #[test]
    fn test_tokenize_two_groups() {
        assert_eq!(
            tokenize("(temple OR mandir) AND (vishweshwara OR viswesvara)"),
            vec![
                "(", "temple", "OR", "mandir", ")", "AND", "(", "vishweshwara", "OR",
                "viswesvara", ")"
            ]
        );
    }

    #[test]
    fn test_tokenize_glued_parens_and_whitespace() {
        assert_eq!(tokenize("  ((swami)\tAND\nguru)) "), vec!["(", "(", "swami", ")", "AND", "guru", ")", ")"]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \n").is_empty());
    }
}
