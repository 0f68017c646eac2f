//! A simplified, porter-like suffix-stripping stemmer. It trades the full
//! Porter algorithm's multi-step vowel/consonant measure rules for a single
//! ordered suffix table, which is enough to collapse the common code-search
//! query variants ("indexing" / "indexes" / "indexed" -> "index").

const STEP1_SUFFIXES: &[(&str, &str)] = &[
    ("ational", "ate"),
    ("ization", "ize"),
    ("fulness", "ful"),
    ("ousness", "ous"),
    ("iveness", "ive"),
    ("ational", "ate"),
    ("ement", ""),
    ("ment", ""),
    ("ing", ""),
    ("edly", ""),
    ("ed", ""),
    ("ies", "y"),
    ("es", ""),
    ("s", ""),
];

/// Stem a single lowercase token. Tokens shorter than 4 characters are
/// returned unchanged to avoid mangling short identifiers like `ast`, `fts`.
#[must_use]
pub fn stem(token: &str) -> String {
    if token.len() < 4 {
        return token.to_string();
    }
    for (suffix, replacement) in STEP1_SUFFIXES {
        if token.ends_with(suffix) && token.len() > suffix.len() + 1 {
            let stem_len = token.len() - suffix.len();
            return format!("{}{}", &token[..stem_len], replacement);
        }
    }
    token.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_common_verb_suffixes() {
        assert_eq!(stem("indexing"), "index");
        assert_eq!(stem("indexed"), "index");
        assert_eq!(stem("indexes"), "index");
    }

    #[test]
    fn leaves_short_tokens_untouched() {
        assert_eq!(stem("fts"), "fts");
        assert_eq!(stem("ast"), "ast");
    }

    #[test]
    fn collapses_plural_queries() {
        assert_eq!(stem("queries"), "query");
    }
}
