use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Built-in `term -> additional terms` table, grouped by domain below for
/// readability. Expansion only ever appends terms; it never removes or
/// reorders what the caller typed.
static BUILTIN_EXPANSIONS: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    HashMap::from([
        // authentication
        ("auth", &["authentication", "authorization"] as &[&str]),
        ("login", &["signin", "sign-in", "authenticate"]),
        ("logout", &["signout", "sign-out"]),
        ("token", &["jwt", "bearer", "credential"]),
        ("password", &["passwd", "credential", "secret"]),
        ("session", &["cookie", "token"]),
        ("permission", &["authorization", "acl", "role"]),
        ("oauth", &["sso", "openid"]),
        // storage
        ("db", &["database", "datastore"]),
        ("database", &["db", "datastore", "storage"]),
        ("storage", &["store", "persistence", "repository"]),
        ("cache", &["memoize", "memoization"]),
        ("query", &["search", "lookup", "fetch"]),
        ("table", &["schema", "relation"]),
        ("migration", &["schema change", "upgrade"]),
        ("index", &["idx"]),
        // api
        ("api", &["endpoint", "interface", "service"]),
        ("endpoint", &["route", "handler", "api"]),
        ("route", &["endpoint", "path", "handler"]),
        ("rest", &["http api", "restful"]),
        ("request", &["req", "call"]),
        ("response", &["res", "resp", "reply"]),
        ("handler", &["controller", "callback"]),
        ("client", &["consumer"]),
        ("server", &["service", "backend"]),
        // async
        ("async", &["asynchronous", "concurrent", "await"]),
        ("await", &["async"]),
        ("thread", &["worker", "goroutine", "task"]),
        ("task", &["job", "thread", "future"]),
        ("future", &["promise", "task"]),
        ("lock", &["mutex", "semaphore"]),
        ("queue", &["channel", "buffer"]),
        // errors
        ("error", &["exception", "failure", "err"]),
        ("exception", &["error", "fault"]),
        ("panic", &["crash", "abort"]),
        ("fail", &["error", "failure"]),
        ("bug", &["defect", "issue"]),
        ("retry", &["backoff", "resilience"]),
        ("timeout", &["deadline"]),
        // config
        ("config", &["configuration", "settings", "options"]),
        ("setting", &["option", "preference", "config"]),
        ("env", &["environment", "variable"]),
        ("flag", &["toggle", "feature flag"]),
        ("default", &["fallback"]),
        // testing
        ("test", &["spec", "unittest"]),
        ("mock", &["stub", "fake", "double"]),
        ("assert", &["expect", "verify"]),
        ("fixture", &["setup", "scaffold"]),
        ("suite", &["testsuite"]),
        // logging
        ("log", &["logger", "logging"]),
        ("logger", &["log"]),
        ("trace", &["span", "telemetry"]),
        ("metric", &["telemetry", "gauge", "counter"]),
        // filesystem
        ("file", &["document", "path"]),
        ("directory", &["folder", "dir"]),
        ("path", &["filepath", "location"]),
        ("read", &["load", "fetch"]),
        ("write", &["save", "persist"]),
        ("delete", &["remove", "unlink"]),
        // networking
        ("socket", &["connection", "conn"]),
        ("connection", &["socket", "conn", "link"]),
        ("retry", &["backoff"]),
        ("websocket", &["ws", "socket"]),
        ("proxy", &["gateway"]),
        // abbreviations
        ("fn", &["function"]),
        ("func", &["function"]),
        ("impl", &["implementation"]),
        ("ctx", &["context"]),
        ("cfg", &["config", "configuration"]),
        ("msg", &["message"]),
        ("pkg", &["package", "module"]),
        ("repo", &["repository"]),
        ("addr", &["address"]),
        ("var", &["variable"]),
    ])
});

const DEFAULT_MAX_EXPANSION_TERMS: usize = 10;

/// Expands a user query for the semantic/embedding side of a search while
/// leaving the original text untouched for the lexical (FTS) side.
///
/// Built-in mappings merge with any custom mappings the caller supplies
/// (custom entries win on conflict); the result always starts with the
/// original tokens and appends synonyms until `max_terms` is hit.
pub struct QueryExpander {
    custom: HashMap<String, Vec<String>>,
    max_terms: usize,
}

impl QueryExpander {
    #[must_use]
    pub fn new() -> Self {
        Self {
            custom: HashMap::new(),
            max_terms: DEFAULT_MAX_EXPANSION_TERMS,
        }
    }

    #[must_use]
    pub fn with_custom_mappings(mut self, mappings: HashMap<String, Vec<String>>) -> Self {
        self.custom = mappings;
        self
    }

    #[must_use]
    pub fn with_max_terms(mut self, max_terms: usize) -> Self {
        self.max_terms = max_terms;
        self
    }

    fn lookup(&self, term: &str) -> Vec<String> {
        if let Some(custom) = self.custom.get(term) {
            return custom.clone();
        }
        BUILTIN_EXPANSIONS
            .get(term)
            .map(|terms| terms.iter().map(|s| (*s).to_string()).collect())
            .unwrap_or_default()
    }

    /// Returns the query used for embedding: original tokens first, then
    /// synonyms for each token in order, deduplicated, capped at
    /// `max_terms` additional terms beyond the original query text.
    #[must_use]
    pub fn expand(&self, query: &str) -> String {
        let original_tokens: Vec<String> =
            query.split_whitespace().map(|t| t.to_lowercase()).collect();
        let mut seen: std::collections::HashSet<String> = original_tokens.iter().cloned().collect();
        let mut added = Vec::new();

        for token in &original_tokens {
            if added.len() >= self.max_terms {
                break;
            }
            for synonym in self.lookup(token) {
                if added.len() >= self.max_terms {
                    break;
                }
                if seen.insert(synonym.clone()) {
                    added.push(synonym);
                }
            }
        }

        if added.is_empty() {
            query.to_string()
        } else {
            format!("{query} {}", added.join(" "))
        }
    }
}

impl Default for QueryExpander {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_term_without_dropping_original_query() {
        let expander = QueryExpander::new();
        let expanded = expander.expand("auth token");
        assert!(expanded.starts_with("auth token"));
        assert!(expanded.contains("authentication"));
        assert!(expanded.contains("jwt"));
    }

    #[test]
    fn unknown_term_passes_through_unchanged() {
        let expander = QueryExpander::new();
        assert_eq!(expander.expand("xyzzy plugh"), "xyzzy plugh");
    }

    #[test]
    fn custom_mapping_overrides_builtin() {
        let mut custom = HashMap::new();
        custom.insert("auth".to_string(), vec!["myoverride".to_string()]);
        let expander = QueryExpander::new().with_custom_mappings(custom);
        let expanded = expander.expand("auth");
        assert!(expanded.contains("myoverride"));
        assert!(!expanded.contains("authentication"));
    }

    #[test]
    fn respects_max_expansion_terms_cap() {
        let expander = QueryExpander::new().with_max_terms(1);
        let expanded = expander.expand("auth login");
        let added_count = expanded.split_whitespace().count() - 2;
        assert_eq!(added_count, 1);
    }
}
