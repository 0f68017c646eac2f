use serde::{Deserialize, Serialize};

/// BM25 parameters for the FTS side of a hybrid search. `context-fts`'s
/// native engine uses SQLite FTS5's own `bm25()`; this config is consulted
/// by the in-memory engine, which implements the same k1/b formula by hand.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bm25Config {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

/// How a candidate was found, for callers that want to explain a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    Exact,
    Fuzzy,
    Semantic,
}

/// Tunable multipliers for the advanced ranker. Defaults match the spec's
/// reference values; every factor is independently overridable, and setting
/// `enabled = false` makes reranking the identity function on the fused
/// score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RerankConfig {
    pub enabled: bool,
    pub class_intent_boost: f32,
    pub function_intent_boost: f32,
    pub test_intent_boost: f32,
    pub exact_name_boost: f32,
    pub high_overlap_boost: f32,
    pub mid_overlap_boost: f32,
    pub low_overlap_boost: f32,
    pub any_overlap_boost: f32,
    pub path_match_per_token: f32,
    pub path_match_cap: f32,
    pub docstring_bonus: f32,
    pub long_text_penalty: f32,
    pub very_long_text_penalty: f32,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            class_intent_boost: 1.3,
            function_intent_boost: 1.15,
            test_intent_boost: 1.2,
            exact_name_boost: 1.4,
            high_overlap_boost: 1.3,
            mid_overlap_boost: 1.2,
            low_overlap_boost: 1.1,
            any_overlap_boost: 1.05,
            path_match_per_token: 0.05,
            path_match_cap: 0.2,
            docstring_bonus: 1.05,
            long_text_penalty: 0.98,
            very_long_text_penalty: 0.95,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Thresholds {
    pub candidate_multiplier: usize,
    pub min_fuzzy_score: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            candidate_multiplier: 5,
            min_fuzzy_score: 0.15,
        }
    }
}

/// Bundles BM25/rerank/candidate-pool tuning plus a coarse path
/// allow/penalize list, the way the teacher's `hybrid.rs` already expected
/// a `profile` to answer `is_rejected`/`min_fuzzy_score`/`path_weight`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchProfile {
    pub bm25: Bm25Config,
    pub rerank: RerankConfig,
    pub thresholds: Thresholds,
    rejected_path_fragments: Vec<String>,
    penalized_path_fragments: Vec<(String, f32)>,
}

impl SearchProfile {
    #[must_use]
    pub fn general() -> Self {
        Self {
            bm25: Bm25Config::default(),
            rerank: RerankConfig::default(),
            thresholds: Thresholds::default(),
            rejected_path_fragments: vec![
                "/node_modules/".to_string(),
                "/target/".to_string(),
                "/.git/".to_string(),
                "/dist/".to_string(),
                "/build/".to_string(),
            ],
            penalized_path_fragments: vec![
                ("/tests/".to_string(), 0.7),
                ("/test/".to_string(), 0.7),
                ("/vendor/".to_string(), 0.6),
            ],
        }
    }

    #[must_use]
    pub fn is_rejected(&self, path: &str) -> bool {
        let lower = path.to_ascii_lowercase();
        self.rejected_path_fragments.iter().any(|f| lower.contains(f.as_str()))
    }

    #[must_use]
    pub fn min_fuzzy_score(&self) -> f32 {
        self.thresholds.min_fuzzy_score
    }

    #[must_use]
    pub fn candidate_multiplier(&self) -> usize {
        self.thresholds.candidate_multiplier
    }

    /// Multiplicative penalty for paths that look like test/vendor code;
    /// `1.0` (no penalty) when no fragment matches.
    #[must_use]
    pub fn path_weight(&self, path: &str) -> f32 {
        let lower = path.to_ascii_lowercase();
        self.penalized_path_fragments
            .iter()
            .filter(|(fragment, _)| lower.contains(fragment.as_str()))
            .map(|(_, weight)| *weight)
            .fold(1.0_f32, f32::min)
    }
}

impl Default for SearchProfile {
    fn default() -> Self {
        Self::general()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_dependency_and_vcs_directories() {
        let profile = SearchProfile::general();
        assert!(profile.is_rejected("project/node_modules/left-pad/index.js"));
        assert!(!profile.is_rejected("project/src/lib.rs"));
    }

    #[test]
    fn penalizes_test_paths_without_rejecting_them() {
        let profile = SearchProfile::general();
        assert!(profile.path_weight("project/tests/foo.rs") < 1.0);
        assert_eq!(profile.path_weight("project/src/foo.rs"), 1.0);
    }
}
