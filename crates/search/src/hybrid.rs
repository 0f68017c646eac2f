use crate::error::{Result, SearchError};
use crate::fusion::RRFFusion;
use crate::fuzzy::FuzzySearch;
use crate::profile::SearchProfile;
use crate::query_classifier::{split_query_tokens, QueryClassifier, QueryWeights};
use crate::query_expansion::QueryExpander;
use crate::rerank::rerank_score;
use context_indexer::{IndexManager, IndexerError, SearchMode, TableKind};
use context_vector_store::{Purpose, VectorRow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// One ranked hit returned to callers: the row's location and content plus
/// the final blended score, independent of how it was found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    pub symbol: Option<String>,
    pub symbol_type: Option<String>,
    pub score: f32,
    pub content: String,
}

impl SearchResult {
    fn from_row(row: &VectorRow, score: f32) -> Self {
        Self {
            file: row.path.clone(),
            start_line: row.start_line,
            end_line: row.end_line,
            symbol: row.symbol_name.clone(),
            symbol_type: row.chunk_type.clone(),
            score,
            content: row.text.clone(),
        }
    }
}

/// Hybrid search combining an [`context_indexer::IndexManager`]'s own
/// vector+FTS fusion with a fuzzy path/symbol pass and the rule-based
/// reranker, on top of query expansion and intent classification.
pub struct HybridSearch {
    manager: Arc<IndexManager>,
    fuzzy: FuzzySearch,
    fusion: RRFFusion,
    expander: QueryExpander,
    profile: SearchProfile,
}

impl HybridSearch {
    #[must_use]
    pub fn new(manager: Arc<IndexManager>) -> Self {
        Self::with_profile(manager, SearchProfile::general())
    }

    #[must_use]
    pub fn with_profile(manager: Arc<IndexManager>, profile: SearchProfile) -> Self {
        Self {
            manager,
            fuzzy: FuzzySearch::new(),
            fusion: RRFFusion::default(),
            expander: QueryExpander::new(),
            profile,
        }
    }

    /// Search with full hybrid strategy: vector+FTS fusion (via the index
    /// manager) + fuzzy matching + RRF + rule-based rerank.
    pub async fn search(&mut self, kind: TableKind, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        log::debug!("Hybrid search: query='{query}', limit={limit}");

        let expanded_query = self.expander.expand(query);
        log::debug!("Expanded query: '{expanded_query}'");

        let weights = QueryClassifier::weights(query);
        let intent = QueryClassifier::intent(query);
        let tokens = split_query_tokens(query);
        let candidate_pool = Self::candidate_pool(
            limit,
            weights.candidate_multiplier.max(self.profile.candidate_multiplier()),
        );

        let rows = self.manager.all_rows(kind).await;
        let query_vector = self.embed_query(kind, &expanded_query).await?;

        let (fused_hits, warning) = self
            .manager
            .search(kind, &expanded_query, &query_vector, candidate_pool, SearchMode::Hybrid, weights.semantic)
            .await?;
        if let Some(warning) = &warning {
            log::warn!("{warning}");
        }
        log::debug!("Fused: {} results", fused_hits.len());

        let row_idx_by_id: HashMap<&str, usize> =
            rows.iter().enumerate().map(|(idx, row)| (row.id.as_str(), idx)).collect();
        let rejected: Vec<bool> = rows.iter().map(|row| self.profile.is_rejected(&row.path)).collect();

        let semantic_scores: Vec<(usize, f32)> = fused_hits
            .iter()
            .filter_map(|hit| {
                row_idx_by_id
                    .get(hit.id.as_str())
                    .and_then(|&idx| (!rejected[idx]).then_some((idx, hit.score)))
            })
            .collect();

        let min_fuzzy = self.profile.min_fuzzy_score();
        let fuzzy_scores = Self::filter_fuzzy(self.fuzzy.search(query, &rows, candidate_pool), &rejected, min_fuzzy);
        log::debug!("Fuzzy: {} results", fuzzy_scores.len());

        let fused_scores = self.fusion.fuse_adaptive(query, &weights, &semantic_scores, &fuzzy_scores);

        let mut final_results: Vec<SearchResult> = fused_scores
            .into_iter()
            .filter_map(|(idx, score)| {
                rows.get(idx).map(|row| {
                    let reranked = rerank_score(&self.profile.rerank, query, &intent, score, row);
                    let penalized = reranked * self.profile.path_weight(&row.path);
                    SearchResult::from_row(row, penalized)
                })
            })
            .filter(|result| has_query_overlap(result, &tokens))
            .collect();

        Self::normalize_scores(&mut final_results);
        final_results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        final_results.truncate(limit);

        log::info!("Hybrid search completed: {} final results", final_results.len());
        Ok(final_results)
    }

    /// Batch search for multiple queries over the same table (more
    /// efficient than sequential calls: embeds all queries in one batch and
    /// fetches the row universe once).
    pub async fn search_batch(&mut self, kind: TableKind, queries: &[&str], limit: usize) -> Result<Vec<Vec<SearchResult>>> {
        if queries.is_empty() {
            return Ok(vec![]);
        }
        for query in queries {
            if query.trim().is_empty() {
                return Err(SearchError::EmptyQuery);
            }
        }
        log::debug!("Batch hybrid search: {} queries, limit={}", queries.len(), limit);

        let query_weights: Vec<QueryWeights> = queries.iter().map(|q| QueryClassifier::weights(q)).collect();
        let tokens: Vec<Vec<String>> = queries.iter().map(|q| split_query_tokens(q)).collect();
        let max_multiplier = query_weights
            .iter()
            .map(|w| w.candidate_multiplier)
            .max()
            .unwrap_or(5)
            .max(self.profile.candidate_multiplier());
        let candidate_pool = Self::candidate_pool(limit, max_multiplier);

        let rows = self.manager.all_rows(kind).await;
        let row_idx_by_id: HashMap<&str, usize> =
            rows.iter().enumerate().map(|(idx, row)| (row.id.as_str(), idx)).collect();
        let rejected: Vec<bool> = rows.iter().map(|row| self.profile.is_rejected(&row.path)).collect();

        let expanded_queries: Vec<String> = queries.iter().map(|q| self.expander.expand(q)).collect();
        let query_vectors = self.embed_query_batch(kind, &expanded_queries).await?;

        let mut all_final_results = Vec::with_capacity(queries.len());
        for (i, query) in queries.iter().enumerate() {
            let weights = query_weights[i];
            let intent = QueryClassifier::intent(query);

            let (fused_hits, warning) = self
                .manager
                .search(kind, &expanded_queries[i], &query_vectors[i], candidate_pool, SearchMode::Hybrid, weights.semantic)
                .await?;
            if let Some(warning) = &warning {
                log::warn!("{warning}");
            }

            let semantic_scores: Vec<(usize, f32)> = fused_hits
                .iter()
                .filter_map(|hit| {
                    row_idx_by_id
                        .get(hit.id.as_str())
                        .and_then(|&idx| (!rejected[idx]).then_some((idx, hit.score)))
                })
                .collect();

            let min_fuzzy = self.profile.min_fuzzy_score();
            let fuzzy_scores = Self::filter_fuzzy(self.fuzzy.search(query, &rows, candidate_pool), &rejected, min_fuzzy);

            let fused_scores = self.fusion.fuse_adaptive(query, &weights, &semantic_scores, &fuzzy_scores);

            let mut final_results: Vec<SearchResult> = fused_scores
                .into_iter()
                .filter_map(|(idx, score)| {
                    rows.get(idx).map(|row| {
                        let reranked = rerank_score(&self.profile.rerank, query, &intent, score, row);
                        let penalized = reranked * self.profile.path_weight(&row.path);
                        SearchResult::from_row(row, penalized)
                    })
                })
                .filter(|result| has_query_overlap(result, &tokens[i]))
                .collect();

            Self::normalize_scores(&mut final_results);
            final_results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            final_results.truncate(limit);

            log::debug!("Query {}/{}: {} final results", i + 1, queries.len(), final_results.len());
            all_final_results.push(final_results);
        }

        log::info!("Batch hybrid search completed: {} queries", queries.len());
        Ok(all_final_results)
    }

    /// Semantic-only search (bypass fuzzy/fusion for speed)
    pub async fn search_semantic_only(&self, kind: TableKind, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let query_vector = self.embed_query(kind, query).await?;
        let (fused_hits, _warning) = self
            .manager
            .search(kind, query, &query_vector, limit, SearchMode::Vector, 1.0)
            .await?;
        Ok(fused_hits
            .into_iter()
            .map(|hit| SearchResult {
                file: hit.path,
                start_line: hit.start_line,
                end_line: hit.end_line,
                symbol: hit.symbol_name,
                symbol_type: hit.chunk_type,
                score: hit.score,
                content: hit.text,
            })
            .collect())
    }

    async fn embed_query(&self, kind: TableKind, text: &str) -> Result<Vec<f32>> {
        let embedder = match kind {
            TableKind::Code => self.manager.code_embedder(),
            TableKind::Docs => self.manager.docs_embedder(),
        };
        embedder
            .embed(text, Purpose::Query)
            .await
            .map_err(|e| SearchError::Indexer(IndexerError::Other(format!("query embedding failed: {e}"))))
    }

    async fn embed_query_batch(&self, kind: TableKind, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embedder = match kind {
            TableKind::Code => self.manager.code_embedder(),
            TableKind::Docs => self.manager.docs_embedder(),
        };
        embedder
            .embed_batch(texts, Purpose::Query)
            .await
            .map_err(|e| SearchError::Indexer(IndexerError::Other(format!("query embedding failed: {e}"))))
    }

    /// Normalize scores to 0-1 range using min-max normalization
    pub fn normalize_scores(results: &mut [SearchResult]) {
        if results.is_empty() {
            return;
        }

        let mut min_score = f32::MAX;
        let mut max_score = f32::MIN;

        let mut had_invalid = false;
        for result in results.iter() {
            if result.score.is_finite() {
                min_score = min_score.min(result.score);
                max_score = max_score.max(result.score);
            } else {
                had_invalid = true;
            }
        }

        if !min_score.is_finite() || !max_score.is_finite() {
            for result in results {
                result.score = 0.0;
            }
            return;
        }

        if had_invalid && (max_score - min_score).abs() < f32::EPSILON {
            for result in results {
                result.score = if result.score.is_finite() { 1.0 } else { 0.0 };
            }
            return;
        }

        const MIN_DELTA: f32 = 1e-6;
        if (max_score - min_score).abs() < MIN_DELTA {
            for result in results {
                result.score = 1.0;
            }
            return;
        }

        for result in results.iter_mut() {
            if !result.score.is_finite() {
                log::warn!("Invalid score detected for {} — resetting to min", result.file);
                result.score = min_score;
            }
        }

        let range = max_score - min_score;
        for result in results {
            result.score = (result.score - min_score) / range;
        }

        log::debug!("Normalized scores: range [{min_score:.4}, {max_score:.4}] -> [0.0, 1.0]");
    }

    fn candidate_pool(limit: usize, multiplier: usize) -> usize {
        let limit = limit.max(1);
        let multiplier = multiplier.max(4);
        limit * multiplier
    }

    fn filter_fuzzy(scores: Vec<(usize, f32)>, rejected: &[bool], min_score: f32) -> Vec<(usize, f32)> {
        scores
            .into_iter()
            .filter(|(idx, score)| *score >= min_score && !rejected.get(*idx).copied().unwrap_or(false))
            .collect()
    }
}

fn has_query_overlap(result: &SearchResult, tokens: &[String]) -> bool {
    if tokens.is_empty() {
        return true;
    }
    let mut haystacks = vec![result.file.to_ascii_lowercase(), result.content.to_ascii_lowercase()];
    if let Some(symbol) = &result.symbol {
        haystacks.push(symbol.to_ascii_lowercase());
    }
    tokens.iter().any(|token| haystacks.iter().any(|hay| hay.contains(token.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_result(file: &str, symbol: &str, content: &str) -> SearchResult {
        SearchResult {
            file: file.to_string(),
            start_line: 1,
            end_line: 10,
            symbol: Some(symbol.to_string()),
            symbol_type: Some("function".to_string()),
            score: 0.5,
            content: content.to_string(),
        }
    }

    #[test]
    fn filters_by_query_overlap() {
        let hit = row_result(
            "src/utils/selection_tables.rs",
            "create_selection_tables_handlers",
            "Selection tables helper functions",
        );
        let missing = row_result("src/app/page.tsx", "page", "admin dashboard page");

        let tokens = split_query_tokens("selection tables helper");
        assert!(has_query_overlap(&hit, &tokens));
        assert!(!has_query_overlap(&missing, &tokens));
    }

    #[test]
    fn normalize_scores_collapses_equal_scores_to_one() {
        let mut results = vec![row_result("a.rs", "a", "a"), row_result("b.rs", "b", "b")];
        results[0].score = 0.42;
        results[1].score = 0.42;
        HybridSearch::normalize_scores(&mut results);
        assert_eq!(results[0].score, 1.0);
        assert_eq!(results[1].score, 1.0);
    }

    #[test]
    fn normalize_scores_spreads_distinct_scores_into_unit_range() {
        let mut results = vec![row_result("a.rs", "a", "a"), row_result("b.rs", "b", "b")];
        results[0].score = 0.2;
        results[1].score = 0.8;
        HybridSearch::normalize_scores(&mut results);
        assert_eq!(results[0].score, 0.0);
        assert_eq!(results[1].score, 1.0);
    }
}
