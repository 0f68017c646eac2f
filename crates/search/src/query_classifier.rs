use once_cell::sync::Lazy;
use regex::Regex;

static CAMEL_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"));
static ENTITY_LIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_:.]*$").expect("valid regex"));

/// Splits on non-alphanumeric characters and on camelCase boundaries,
/// lowercasing every piece. Shared by the intent detector and the hybrid
/// searcher so the same query produces the same tokens everywhere.
#[must_use]
pub fn split_query_tokens(query: &str) -> Vec<String> {
    let spaced = CAMEL_BOUNDARY.replace_all(query, "$1 $2");
    spaced
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .flat_map(|piece| piece.split('_'))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// True when the normalized query looks like a single identifier (function
/// name, type name, qualified path) rather than a natural-language
/// question — no whitespace, and only identifier/qualifier characters.
#[must_use]
pub fn is_entity_like(query: &str) -> bool {
    let trimmed = query.trim();
    !trimmed.is_empty() && ENTITY_LIKE.is_match(trimmed)
}

macro_rules! intent_categories {
    ($($variant:ident => $field:ident : $keywords:expr),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum IntentCategory {
            $($variant),+
        }

        impl IntentCategory {
            pub const ALL: &'static [IntentCategory] = &[$(IntentCategory::$variant),+];

            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(IntentCategory::$variant => stringify!($field)),+
                }
            }

            fn keywords(self) -> &'static [&'static str] {
                match self {
                    $(IntentCategory::$variant => &$keywords),+
                }
            }
        }

        /// Multi-label confidence per category; each is independent in
        /// `[0, 1]`, not a single winner-take-all classification.
        #[derive(Debug, Clone, Copy, Default, PartialEq)]
        pub struct QueryIntent {
            $(pub $field: f32),+
        }

        impl QueryIntent {
            fn set(&mut self, category: IntentCategory, value: f32) {
                match category {
                    $(IntentCategory::$variant => self.$field = value),+
                }
            }

            #[must_use]
            pub fn get(&self, category: IntentCategory) -> f32 {
                match category {
                    $(IntentCategory::$variant => self.$field),+
                }
            }
        }
    };
}

intent_categories! {
    Function => function: ["fn", "function", "func", "method", "def", "procedure", "routine", "callback"],
    Class => class: ["class", "struct", "type", "interface", "trait", "enum", "object", "model"],
    Error => error: ["error", "exception", "panic", "fail", "failure", "bug", "crash", "throw", "catch"],
    Database => database: ["db", "database", "sql", "query", "table", "schema", "migration", "index", "row"],
    Api => api: ["api", "endpoint", "route", "handler", "rest", "http", "request", "response", "controller"],
    Auth => auth: ["auth", "login", "logout", "token", "session", "password", "permission", "oauth", "jwt", "credential"],
    Test => test: ["test", "spec", "mock", "assert", "fixture", "suite", "stub"],
    Config => config: ["config", "configuration", "setting", "settings", "env", "option", "flag", "yaml", "toml"],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// Normalized query is a bare identifier; favor exact/fuzzy matching.
    EntityLookup,
    /// Natural-language query with no strong intent signal.
    Semantic,
    /// Has both identifier-shaped tokens and natural-language structure.
    Mixed,
}

#[derive(Debug, Clone, Copy)]
pub struct QueryWeights {
    pub semantic: f32,
    pub fuzzy: f32,
    pub candidate_multiplier: usize,
}

pub struct QueryClassifier;

impl QueryClassifier {
    /// Runs the multi-label intent detector over `query`. Pure token
    /// matching against a fixed table — no model inference — so this stays
    /// well under the spec's 10ms budget even on long queries.
    #[must_use]
    pub fn intent(query: &str) -> QueryIntent {
        let tokens = split_query_tokens(query);
        let mut intent = QueryIntent::default();
        if tokens.is_empty() {
            return intent;
        }
        for category in IntentCategory::ALL {
            let keywords = category.keywords();
            let hits = tokens.iter().filter(|t| keywords.contains(&t.as_str())).count();
            if hits > 0 {
                let confidence = (hits as f32 / tokens.len() as f32).min(1.0);
                intent.set(*category, confidence);
            }
        }
        intent
    }

    #[must_use]
    pub fn is_entity_like(query: &str) -> bool {
        is_entity_like(query)
    }

    #[must_use]
    pub fn classify(query: &str) -> QueryType {
        if is_entity_like(query) {
            return QueryType::EntityLookup;
        }
        let tokens = split_query_tokens(query);
        let intent = Self::intent(query);
        let has_intent = IntentCategory::ALL.iter().any(|c| intent.get(*c) > 0.0);
        if tokens.len() <= 2 && has_intent {
            QueryType::Mixed
        } else {
            QueryType::Semantic
        }
    }

    /// Blends semantic/fuzzy weight and the candidate-pool multiplier based
    /// on query shape: an entity-like query leans heavily on fuzzy/exact
    /// matching and widens the candidate pool since semantic similarity is
    /// a weak signal for a bare identifier.
    #[must_use]
    pub fn weights(query: &str) -> QueryWeights {
        match Self::classify(query) {
            QueryType::EntityLookup => QueryWeights {
                semantic: 0.3,
                fuzzy: 0.7,
                candidate_multiplier: 8,
            },
            QueryType::Mixed => QueryWeights {
                semantic: 0.65,
                fuzzy: 0.35,
                candidate_multiplier: 6,
            },
            QueryType::Semantic => QueryWeights {
                semantic: 0.8,
                fuzzy: 0.2,
                candidate_multiplier: 5,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_identifier_is_entity_like() {
        assert!(is_entity_like("get_user_by_id"));
        assert!(is_entity_like("UserRepository::find"));
        assert!(!is_entity_like("how do I get a user by id"));
    }

    #[test]
    fn entity_like_query_favors_fuzzy_weight() {
        let weights = QueryClassifier::weights("parse_config");
        assert!(weights.fuzzy > weights.semantic);
    }

    #[test]
    fn intent_detector_is_multi_label() {
        let intent = QueryClassifier::intent("test the login api handler");
        assert!(intent.test > 0.0);
        assert!(intent.auth > 0.0);
        assert!(intent.api > 0.0);
    }

    #[test]
    fn camel_case_and_snake_case_both_split() {
        assert!(split_query_tokens("getUserById").contains(&"user".to_string()));
        assert!(split_query_tokens("get_user_by_id").contains(&"user".to_string()));
    }

    #[test]
    fn natural_language_query_has_no_strong_intent_is_semantic() {
        assert_eq!(QueryClassifier::classify("how does this work"), QueryType::Semantic);
    }
}
