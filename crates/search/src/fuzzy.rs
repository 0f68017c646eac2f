use context_vector_store::VectorRow;
use nucleo_matcher::{pattern::Pattern, Matcher};

/// Fuzzy search for indexed rows using nucleo-matcher
pub struct FuzzySearch {
    matcher: Matcher,
}

impl FuzzySearch {
    #[must_use]
    pub fn new() -> Self {
        Self {
            matcher: Matcher::new(nucleo_matcher::Config::DEFAULT),
        }
    }

    /// Search rows by fuzzy matching against paths and symbol names
    /// Returns (`row_index`, score) sorted by score descending
    #[allow(clippy::cast_precision_loss)]
    pub fn search(&mut self, query: &str, rows: &[VectorRow], limit: usize) -> Vec<(usize, f32)> {
        let pattern = Pattern::parse(
            query,
            nucleo_matcher::pattern::CaseMatching::Smart,
            nucleo_matcher::pattern::Normalization::Smart,
        );

        let mut scored: Vec<(usize, u32, bool)> = rows
            .iter()
            .enumerate()
            .filter_map(|(idx, row)| {
                let exact_symbol = row
                    .symbol_name
                    .as_ref()
                    .is_some_and(|name| name.eq_ignore_ascii_case(query));

                // Try matching against multiple targets
                let path_haystack = nucleo_matcher::Utf32String::from(row.path.as_str());
                let path_score = pattern.score(path_haystack.slice(..), &mut self.matcher);

                let symbol_score = row.symbol_name.as_ref().and_then(|name| {
                    let symbol_haystack = nucleo_matcher::Utf32String::from(name.as_str());
                    pattern.score(symbol_haystack.slice(..), &mut self.matcher)
                });

                // Safe Unicode truncation: find char boundary at or before 200 bytes
                let content_preview = if row.text.len() > 200 {
                    let mut boundary = 200.min(row.text.len());
                    while boundary > 0 && !row.text.is_char_boundary(boundary) {
                        boundary -= 1;
                    }
                    &row.text[..boundary]
                } else {
                    &row.text
                };
                let content_haystack = nucleo_matcher::Utf32String::from(content_preview);
                let content_score = pattern.score(content_haystack.slice(..), &mut self.matcher);

                // Take best score
                let best_score = [path_score, symbol_score, content_score]
                    .into_iter()
                    .flatten()
                    .max()?;

                Some((idx, best_score, exact_symbol))
            })
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let max_score = scored
            .iter()
            .map(|(_, score, _)| *score as f32)
            .fold(0.0f32, f32::max);

        // Sort by exact symbol match first, then by score descending
        scored.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| b.1.cmp(&a.1)));
        scored.truncate(limit);

        scored
            .into_iter()
            .map(|(idx, score, exact_symbol)| {
                let normalized = if exact_symbol {
                    1.0
                } else if max_score > 0.0 {
                    score as f32 / max_score
                } else {
                    0.0
                };
                (idx, normalized)
            })
            .collect()
    }
}

impl Default for FuzzySearch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_row(path: &str, symbol: &str, content: &str) -> VectorRow {
        VectorRow {
            id: format!("{path}:1"),
            path: path.to_string(),
            text: content.to_string(),
            vector: Vec::new(),
            start_line: 1,
            end_line: 10,
            content_hash: "h".to_string(),
            chunk_hash: "c".to_string(),
            chunk_type: Some("function".to_string()),
            symbol_name: Some(symbol.to_string()),
            has_documentation: false,
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_fuzzy_path_match() {
        let mut fuzzy = FuzzySearch::new();
        let rows = vec![
            create_row("src/api/handler.rs", "process", "fn process() {}"),
            create_row("src/main.rs", "main", "fn main() {}"),
            create_row("tests/api_test.rs", "test", "fn test() {}"),
        ];

        let results = fuzzy.search("api", &rows, 5);

        assert!(!results.is_empty());
        // "src/api/handler.rs" and "tests/api_test.rs" should match
        assert!(results.iter().any(|(idx, _)| *idx == 0));
    }

    #[test]
    fn test_fuzzy_symbol_match() {
        let mut fuzzy = FuzzySearch::new();
        let rows = vec![
            create_row("test.rs", "get_user", "fn get_user() {}"),
            create_row("test.rs", "set_data", "fn set_data() {}"),
            create_row("test.rs", "fetch_item", "fn fetch_item() {}"),
        ];

        let results = fuzzy.search("get", &rows, 5);

        assert!(!results.is_empty());
        // "get_user" should be first
        assert_eq!(results[0].0, 0);
    }

    #[test]
    fn test_fuzzy_exact_symbol_match_is_prioritized() {
        let mut fuzzy = FuzzySearch::new();
        let rows = vec![
            create_row("test.rs", "get_user", "fn get_user() {}"),
            create_row("test.rs", "get_user_profile", "fn get_user_profile() {}"),
        ];

        let results = fuzzy.search("get_user", &rows, 5);
        assert!(!results.is_empty());
        assert_eq!(results[0].0, 0);
        assert_eq!(results[0].1, 1.0);
    }

    #[test]
    fn test_fuzzy_typo_tolerance() {
        let mut fuzzy = FuzzySearch::new();
        let rows = vec![create_row(
            "test.rs",
            "process_data",
            "fn process_data() {}",
        )];

        // "proces" (typo) should still match "process_data"
        let results = fuzzy.search("proces", &rows, 5);
        assert!(!results.is_empty());
    }
}
