//! String similarity ratios on a 0–100 scale
//!
//! `ratio` is the normalized indel similarity `200 * LCS / (|a| + |b|)`.
//! `partial_ratio` is the best `ratio` of the shorter string against an
//! equally long window of the longer one. `token_set_ratio` compares token
//! sets through their intersection so a query fully contained in a
//! document scores 100.

use std::collections::BTreeSet;

/// Length of the longest common subsequence, one DP row
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let mut row = vec![0usize; short.len() + 1];
    for &lc in long {
        let mut diag = 0;
        for (j, &sc) in short.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if lc == sc { diag + 1 } else { above.max(row[j]) };
            diag = above;
        }
    }
    row[short.len()]
}

/// Normalized indel similarity
pub fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

pub fn ratio_str(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio(&a, &b)
}

/// Best window ratio of `needle` inside `haystack`.
///
/// Windows start only at the offsets in `starts` (typically word starts).
pub fn partial_ratio(needle: &[char], haystack: &[char], starts: &[usize]) -> f64 {
    if needle.is_empty() || haystack.is_empty() {
        return 0.0;
    }
    if haystack.len() <= needle.len() {
        return ratio(needle, haystack);
    }

    let mut best: f64 = 0.0;
    for &start in starts {
        if start >= haystack.len() {
            break;
        }
        let end = (start + needle.len()).min(haystack.len());
        best = best.max(ratio(needle, &haystack[start..end]));
        if best >= 100.0 {
            break;
        }
    }
    best
}

/// Offsets where an alphanumeric run begins
pub fn word_starts(text: &[char]) -> Vec<usize> {
    text.iter()
        .enumerate()
        .filter(|&(i, c)| c.is_alphanumeric() && (i == 0 || !text[i - 1].is_alphanumeric()))
        .map(|(i, _)| i)
        .collect()
}

/// Token-set similarity; 0 when either side is empty
pub fn token_set_ratio(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let sect: Vec<&str> = a.intersection(b).map(String::as_str).collect();
    let only_a: Vec<&str> = a.difference(b).map(String::as_str).collect();
    let only_b: Vec<&str> = b.difference(a).map(String::as_str).collect();

    if !sect.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 100.0;
    }

    let sect_text = sect.join(" ");
    let joined = |diff: &[&str]| -> Vec<char> {
        if sect_text.is_empty() {
            diff.join(" ").chars().collect()
        } else {
            format!("{} {}", sect_text, diff.join(" ")).chars().collect()
        }
    };
    let combined_a = joined(&only_a);
    let combined_b = joined(&only_b);
    let sect_chars: Vec<char> = sect_text.chars().collect();

    let mut best = ratio(&combined_a, &combined_b);
    if !sect_chars.is_empty() {
        best = best
            .max(ratio(&sect_chars, &combined_a))
            .max(ratio(&sect_chars, &combined_b));
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_ratio() {
        assert_eq!(ratio_str("", ""), 100.0);
        assert_eq!(ratio_str("abc", "abc"), 100.0);
        assert_eq!(ratio_str("abc", "xyz"), 0.0);
        // LCS("temple", "tample") = 5 → 200 * 5 / 12
        assert!((ratio_str("temple", "tample") - 83.333).abs() < 0.01);
        assert_eq!(ratio_str("abc", ""), 0.0);
    }

    #[test]
    fn test_lcs_symmetric() {
        assert_eq!(lcs_len(&chars("swami"), &chars("swamiji")), 5);
        assert_eq!(lcs_len(&chars("swamiji"), &chars("swami")), 5);
    }

    #[test]
    fn test_partial_ratio_finds_window() {
        let text = chars("the old temple of shirali");
        let starts = word_starts(&text);
        assert_eq!(partial_ratio(&chars("temple"), &text, &starts), 100.0);
        assert!(partial_ratio(&chars("tempel"), &text, &starts) < 100.0);
        assert_eq!(partial_ratio(&chars(""), &text, &starts), 0.0);
    }

    #[test]
    fn test_partial_ratio_short_haystack() {
        assert_eq!(partial_ratio(&chars("temple"), &chars("temple"), &[0]), 100.0);
    }

    #[test]
    fn test_word_starts() {
        assert_eq!(word_starts(&chars("ab  cd-ef")), vec![0, 4, 7]);
        assert!(word_starts(&chars("  ")).is_empty());
    }

    #[test]
    fn test_token_set_ratio() {
        assert_eq!(token_set_ratio(&set(&["VSVSVR"]), &set(&["T", "VSVSVR", "MNTR"])), 100.0);
        assert_eq!(token_set_ratio(&set(&[]), &set(&["A"])), 0.0);
        let partial = token_set_ratio(&set(&["VSVSVR", "KRK"]), &set(&["VSVSVR", "TMPL"]));
        assert!(partial > 50.0 && partial < 100.0, "{}", partial);
        assert!(token_set_ratio(&set(&["XX"]), &set(&["YY"])) < 1.0);
    }
}
