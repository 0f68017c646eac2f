use crate::stemmer::stem;
use once_cell::sync::Lazy;
use regex::Regex;

static CAMEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"));

/// Split into lowercase, stemmed word tokens: breaks on non-alphanumeric
/// characters (so `snake_case` and `path/like::this` separate cleanly) and
/// on camelCase boundaries, then stems each piece. Shared by the in-memory
/// index build and its query path so posting lookups and query terms agree.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let spaced = CAMEL_BOUNDARY.replace_all(text, "$1 $2");
    spaced
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .map(|w| stem(&w))
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_snake_case_identifiers_into_words() {
        let tokens = tokenize("fn get_user_by_id");
        assert!(tokens.contains(&"user".to_string()));
        assert!(tokens.contains(&"id".to_string()));
    }

    #[test]
    fn splits_camel_case_identifiers_into_words() {
        let tokens = tokenize("getUserById");
        assert!(tokens.contains(&"user".to_string()));
    }
}
