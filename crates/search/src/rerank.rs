use context_vector_store::VectorRow;

use crate::profile::RerankConfig;
use crate::query_classifier::{split_query_tokens, IntentCategory, QueryIntent};

const LONG_TEXT_CHARS: usize = 2_000;
const VERY_LONG_TEXT_CHARS: usize = 6_000;

/// Applies the advanced ranker's multiplicative formula to a fused base
/// score:
///
/// `final = base * chunkTypeBoost * nameMatchBoost * pathBoost * tagBoost
///          * docstringBonus * complexityPenalty`
///
/// Every factor defaults to `1.0` (no-op) when its signal doesn't apply, so
/// a row with no symbol name, no tags, and no documentation is left exactly
/// at `base * pathBoost * complexityPenalty`.
#[must_use]
pub fn rerank_score(config: &RerankConfig, query: &str, intent: &QueryIntent, base: f32, row: &VectorRow) -> f32 {
    if !config.enabled {
        return base;
    }
    let tokens = split_query_tokens(query);
    base
        * chunk_type_boost(config, intent, row)
        * name_match_boost(config, &tokens, row)
        * path_boost(config, &tokens, row)
        * tag_boost(config, &tokens, row)
        * docstring_bonus(config, row)
        * complexity_penalty(config, row)
}

fn chunk_type_boost(config: &RerankConfig, intent: &QueryIntent, row: &VectorRow) -> f32 {
    let Some(chunk_type) = row.chunk_type.as_deref() else {
        return 1.0;
    };
    match chunk_type {
        "class" | "struct" | "interface" | "enum" if intent.get(IntentCategory::Class) > 0.0 => {
            config.class_intent_boost
        }
        "function" | "method" if intent.get(IntentCategory::Function) > 0.0 => config.function_intent_boost,
        "test" if intent.get(IntentCategory::Test) > 0.0 => config.test_intent_boost,
        _ => 1.0,
    }
}

fn name_match_boost(config: &RerankConfig, tokens: &[String], row: &VectorRow) -> f32 {
    let Some(symbol_name) = row.symbol_name.as_deref() else {
        return 1.0;
    };
    let symbol_lower = symbol_name.to_lowercase();
    if tokens.iter().any(|t| t == &symbol_lower) {
        return config.exact_name_boost;
    }

    let symbol_tokens = split_query_tokens(symbol_name);
    if symbol_tokens.is_empty() || tokens.is_empty() {
        return 1.0;
    }
    let overlap = tokens.iter().filter(|t| symbol_tokens.contains(t)).count();
    let ratio = overlap as f32 / tokens.len() as f32;
    if ratio >= 0.75 {
        config.high_overlap_boost
    } else if ratio >= 0.5 {
        config.mid_overlap_boost
    } else if ratio >= 0.25 {
        config.low_overlap_boost
    } else if overlap > 0 {
        config.any_overlap_boost
    } else {
        1.0
    }
}

fn path_boost(config: &RerankConfig, tokens: &[String], row: &VectorRow) -> f32 {
    let path_lower = row.path.to_lowercase();
    let matches = tokens.iter().filter(|t| path_lower.contains(t.as_str())).count();
    let boost = 1.0 + config.path_match_per_token * matches as f32;
    boost.min(1.0 + config.path_match_cap)
}

fn tag_boost(_config: &RerankConfig, tokens: &[String], row: &VectorRow) -> f32 {
    if row.tags.is_empty() || tokens.is_empty() {
        return 1.0;
    }
    let tag_hit = row.tags.iter().any(|tag| {
        let tag_lower = tag.to_lowercase();
        tokens.iter().any(|t| tag_lower.contains(t.as_str()))
    });
    if tag_hit {
        1.05
    } else {
        1.0
    }
}

fn docstring_bonus(config: &RerankConfig, row: &VectorRow) -> f32 {
    if row.has_documentation {
        config.docstring_bonus
    } else {
        1.0
    }
}

fn complexity_penalty(config: &RerankConfig, row: &VectorRow) -> f32 {
    let len = row.text.len();
    if len >= VERY_LONG_TEXT_CHARS {
        config.very_long_text_penalty
    } else if len >= LONG_TEXT_CHARS {
        config.long_text_penalty
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_classifier::QueryClassifier;

    fn row(symbol_name: Option<&str>, path: &str, chunk_type: Option<&str>, has_documentation: bool, text: &str) -> VectorRow {
        VectorRow {
            id: "id".to_string(),
            path: path.to_string(),
            text: text.to_string(),
            vector: vec![0.0],
            start_line: 1,
            end_line: 2,
            content_hash: "h".to_string(),
            chunk_hash: "c".to_string(),
            chunk_type: chunk_type.map(str::to_string),
            symbol_name: symbol_name.map(str::to_string),
            has_documentation,
            tags: Vec::new(),
        }
    }

    #[test]
    fn exact_symbol_name_match_gets_strongest_name_boost() {
        let config = RerankConfig::default();
        let intent = QueryClassifier::intent("parse_config");
        let r = row(Some("parse_config"), "src/config.rs", Some("function"), false, "fn parse_config() {}");
        let score = rerank_score(&config, "parse_config", &intent, 1.0, &r);
        assert!(score >= config.exact_name_boost * config.function_intent_boost - 0.01);
    }

    #[test]
    fn class_intent_boosts_struct_chunk_type() {
        let config = RerankConfig::default();
        let intent = QueryClassifier::intent("user class");
        let r = row(Some("User"), "src/user.rs", Some("struct"), false, "struct User {}");
        let plain = row(Some("Unrelated"), "src/other.rs", None, false, "fn unrelated() {}");
        let boosted = rerank_score(&config, "user class", &intent, 1.0, &r);
        let baseline = rerank_score(&config, "user class", &intent, 1.0, &plain);
        assert!(boosted > baseline);
    }

    #[test]
    fn disabled_config_is_identity() {
        let mut config = RerankConfig::default();
        config.enabled = false;
        let intent = QueryClassifier::intent("anything");
        let r = row(Some("anything"), "src/lib.rs", Some("function"), true, "fn anything() {}");
        assert_eq!(rerank_score(&config, "anything", &intent, 0.42, &r), 0.42);
    }

    #[test]
    fn very_long_chunk_gets_penalized_more_than_long_chunk() {
        let config = RerankConfig::default();
        let intent = QueryIntent::default();
        let long = row(None, "src/lib.rs", None, false, &"x".repeat(3_000));
        let very_long = row(None, "src/lib.rs", None, false, &"x".repeat(7_000));
        let long_score = rerank_score(&config, "x", &intent, 1.0, &long);
        let very_long_score = rerank_score(&config, "x", &intent, 1.0, &very_long);
        assert!(very_long_score < long_score);
    }
}
