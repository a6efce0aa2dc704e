//! Snippet generation around matched terms
//!
//! Positions are counted in characters, not bytes. Windows never overlap:
//! an occurrence inside an earlier window is skipped, and a new window is
//! clipped where it would run into a neighbour.

use serde::{Deserialize, Serialize};

/// Characters shown when no term occurrence is found
pub const FALLBACK_CHARS: usize = 200;

/// Separator between snippets of one document
pub const SNIPPET_SEPARATOR: &str = " | ";

const ELLIPSIS: &str = "...";

/// Snippet window settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnippetConfig {
    /// Characters of context kept on each side of a match
    pub context_size: usize,
    /// Maximum snippets per document, across all terms
    pub max_snippets: usize,
}

impl Default for SnippetConfig {
    fn default() -> Self {
        Self {
            context_size: 50,
            max_snippets: 3,
        }
    }
}

/// One extracted window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    /// Window start (char index, inclusive)
    pub start: usize,
    /// Window end (char index, exclusive)
    pub end: usize,
    /// Window text with `...` markers where it was cut
    pub text: String,
}

/// Builds the snippet block for a matched document.
///
/// Falls back to the first [`FALLBACK_CHARS`] characters when no term occurs.
pub fn generate_snippet(content: &str, terms: &[String], config: &SnippetConfig) -> String {
    let snippets = find_snippets(content, terms, config);

    if snippets.is_empty() {
        return fallback(content);
    }

    snippets
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(SNIPPET_SEPARATOR)
}

/// Collects non-overlapping windows, terms in order, occurrences left to right
pub fn find_snippets(content: &str, terms: &[String], config: &SnippetConfig) -> Vec<Snippet> {
    let chars: Vec<char> = content.chars().collect();
    let folded: Vec<char> = chars.iter().map(|&c| fold(c)).collect();
    let mut snippets: Vec<Snippet> = Vec::new();

    'terms: for term in terms {
        if snippets.len() >= config.max_snippets {
            break;
        }

        let needle: Vec<char> = term.chars().map(fold).collect();
        if needle.is_empty() {
            continue;
        }

        let mut from = 0;
        while let Some(start) = find(&folded, &needle, from) {
            let end = start + needle.len();
            from = end;

            if snippets.iter().any(|s| start < s.end && s.start < end) {
                continue;
            }

            let mut window_start = start.saturating_sub(config.context_size);
            let mut window_end = (end + config.context_size).min(chars.len());
            for s in &snippets {
                if s.end <= start {
                    window_start = window_start.max(s.end);
                } else if s.start >= end {
                    window_end = window_end.min(s.start);
                }
            }

            let mut text = String::new();
            if window_start > 0 {
                text.push_str(ELLIPSIS);
            }
            text.extend(&chars[window_start..window_end]);
            if window_end < chars.len() {
                text.push_str(ELLIPSIS);
            }

            snippets.push(Snippet {
                start: window_start,
                end: window_end,
                text,
            });

            if snippets.len() >= config.max_snippets {
                break 'terms;
            }
        }
    }

    snippets
}

/// First [`FALLBACK_CHARS`] characters, marked when cut
fn fallback(content: &str) -> String {
    if content.chars().count() > FALLBACK_CHARS {
        let head: String = content.chars().take(FALLBACK_CHARS).collect();
        format!("{}{}", head, ELLIPSIS)
    } else {
        content.to_string()
    }
}

/// Single-char lower-casing so folded text stays index-aligned
fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn find(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_match_with_context() {
        let content = format!("{}swami{}", "a".repeat(60), "b".repeat(60));
        let out = generate_snippet(&content, &terms(&["swami"]), &SnippetConfig::default());
        assert_eq!(out, format!("...{}swami{}...", "a".repeat(50), "b".repeat(50)));
    }

    #[test]
    fn test_short_content_has_no_ellipsis() {
        let out = generate_snippet("Swami visited", &terms(&["swami"]), &SnippetConfig::default());
        assert_eq!(out, "Swami visited");
    }

    #[test]
    fn test_case_insensitive_match_keeps_original_case() {
        let out = generate_snippet("The TEMPLE bell", &terms(&["temple"]), &SnippetConfig::default());
        assert_eq!(out, "The TEMPLE bell");
    }

    #[test]
    fn test_distant_terms_joined() {
        let content = format!("swami {} temple", "x".repeat(200));
        let config = SnippetConfig { context_size: 5, max_snippets: 3 };
        let out = generate_snippet(&content, &terms(&["swami", "temple"]), &config);
        assert_eq!(out, "swami xxxx... | ...xxxx temple");
    }

    #[test]
    fn test_occurrence_inside_window_skipped_and_windows_clipped() {
        let content = "swami and swami then far away the temple stands";
        let config = SnippetConfig { context_size: 12, max_snippets: 5 };
        let found = find_snippets(content, &terms(&["swami", "temple"]), &config);

        for (i, a) in found.iter().enumerate() {
            for b in &found[i + 1..] {
                assert!(a.end <= b.start || b.end <= a.start, "{:?} overlaps {:?}", a, b);
            }
        }
        // second "swami" (char 10) lies inside the first window [0, 17)
        assert_eq!(found.len(), 2);
        assert!(found[1].text.contains("temple"));
    }

    #[test]
    fn test_max_snippets_across_terms() {
        let content = format!("a{0}b{0}c{0}d", " ".repeat(30));
        let config = SnippetConfig { context_size: 2, max_snippets: 2 };
        let found = find_snippets(&content, &terms(&["a", "b", "c", "d"]), &config);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_fallback_when_no_match() {
        let long = "z".repeat(250);
        let out = generate_snippet(&long, &terms(&["swami"]), &SnippetConfig::default());
        assert_eq!(out, format!("{}...", "z".repeat(200)));
        assert_eq!(generate_snippet("short", &[], &SnippetConfig::default()), "short");
    }

    #[test]
    fn test_multibyte_content() {
        let content = "ಶ್ರೀ ಚಿತ್ರಾಪುರ Swami ಮಠ";
        let out = generate_snippet(content, &terms(&["swami"]), &SnippetConfig { context_size: 3, max_snippets: 1 });
        assert!(out.contains("Swami"));
        assert!(out.starts_with("..."));
    }
}
