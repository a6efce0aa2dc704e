//! Phonetic codes for transliterated words
//!
//! A consonant skeleton that folds the spelling variation common in
//! romanised Indic names: `sh`/`s`, `v`/`w`, aspirated consonants,
//! doubled letters and interior vowels all collapse, so
//! `vishweshwara`, `viswesvara` and `visweswara` share the code `VSVSVR`.

/// Encodes a single word. Non-ASCII letters are ignored.
pub fn encode(word: &str) -> String {
    let letters: Vec<char> = word
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    let mut code = String::with_capacity(letters.len());
    let mut i = 0;

    while i < letters.len() {
        let c = letters[i];
        let next = letters.get(i + 1).copied();

        if next == Some(c) {
            i += 1;
            continue;
        }

        let (symbols, consumed): (&str, usize) = match (c, next) {
            ('s', Some('h')) => ("S", 2),
            ('c', Some('h')) => ("C", 2),
            ('t' | 'd', Some('h')) => ("T", 2),
            ('p', Some('h')) => ("F", 2),
            ('b', Some('h')) => ("B", 2),
            ('k' | 'g', Some('h')) => ("K", 2),
            ('j', Some('h')) => ("J", 2),
            ('a' | 'e' | 'i' | 'o' | 'u', _) => (if i == 0 { "A" } else { "" }, 1),
            ('h', _) => ("", 1),
            ('b', _) => ("B", 1),
            ('c' | 'g' | 'k' | 'q', _) => ("K", 1),
            ('d' | 't', _) => ("T", 1),
            ('f', _) => ("F", 1),
            ('j', _) => ("J", 1),
            ('l', _) => ("L", 1),
            ('m', _) => ("M", 1),
            ('n', _) => ("N", 1),
            ('p', _) => ("P", 1),
            ('r', _) => ("R", 1),
            ('s' | 'z', _) => ("S", 1),
            ('v' | 'w', _) => ("V", 1),
            ('x', _) => ("KS", 1),
            ('y', _) => ("Y", 1),
            _ => ("", 1),
        };

        for symbol in symbols.chars() {
            if !code.ends_with(symbol) {
                code.push(symbol);
            }
        }
        i += consumed;
    }

    code
}

/// Encodes every token, dropping tokens without a code
pub fn encode_all<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    tokens
        .into_iter()
        .map(encode)
        .filter(|code| !code.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transliteration_variants_share_code() {
        let code = encode("vishweshwara");
        assert_eq!(code, "VSVSVR");
        for variant in ["viswesvara", "visweswara", "vishwehswara", "Vishweshwara"] {
            assert_eq!(encode(variant), code, "{}", variant);
        }
    }

    #[test]
    fn test_aspirates_and_doubles() {
        assert_eq!(encode("bhagavad"), encode("bagavad"));
        assert_eq!(encode("chitrapur"), encode("chithrapur"));
        assert_eq!(encode("anandashram"), encode("anandasram"));
        assert_eq!(encode("parijnanashram"), encode("parijnanasram"));
        assert_eq!(encode("sammelan"), encode("samelan"));
    }

    #[test]
    fn test_leading_vowel_kept() {
        assert_eq!(encode("ashram"), "ASRM");
        assert_ne!(encode("ashram"), encode("shram"));
    }

    #[test]
    fn test_distinct_words_differ() {
        assert_ne!(encode("temple"), encode("mandir"));
        assert_ne!(encode("swami"), encode("guru"));
    }

    #[test]
    fn test_non_ascii_and_empty() {
        assert_eq!(encode(""), "");
        assert_eq!(encode("ಮಠ"), "");
        assert_eq!(encode_all(["ಮಠ", "math", "123"]), vec!["MT"]);
    }
}
