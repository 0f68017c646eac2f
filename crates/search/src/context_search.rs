use crate::context_pack::{ContextPackBudget, ContextPackItem, ContextPackOutput, CONTEXT_PACK_VERSION};
use crate::error::Result;
use crate::hybrid::{HybridSearch, SearchResult};
use crate::profile::SearchProfile;
use context_indexer::{IndexManager, TableKind};
use context_vector_store::VectorRow;
use std::sync::Arc;

const DEFAULT_RELATED_PER_RESULT: usize = 3;
const DEFAULT_CONTEXT_PACK_MAX_CHARS: usize = 16_000;

/// How a related row was connected to a seed search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelatedContext {
    /// A chunk from the same file, ordered by distance in lines.
    SameFile,
}

impl RelatedContext {
    #[must_use]
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::SameFile => "same_file",
        }
    }
}

/// A search result together with nearby chunks that help explain it.
#[derive(Debug, Clone)]
pub struct EnrichedResult {
    pub result: SearchResult,
    pub related: Vec<(RelatedContext, SearchResult, usize)>,
}

/// Facade over [`HybridSearch`] that adds same-file related context and
/// shapes results into a context pack a caller can hand to an LLM within a
/// character budget.
pub struct ContextSearch {
    manager: Arc<IndexManager>,
    hybrid: HybridSearch,
    profile_name: String,
}

impl ContextSearch {
    #[must_use]
    pub fn new(manager: Arc<IndexManager>) -> Self {
        Self::with_profile(manager, SearchProfile::general(), "general")
    }

    #[must_use]
    pub fn with_profile(manager: Arc<IndexManager>, profile: SearchProfile, profile_name: impl Into<String>) -> Self {
        let hybrid = HybridSearch::with_profile(Arc::clone(&manager), profile);
        Self {
            manager,
            hybrid,
            profile_name: profile_name.into(),
        }
    }

    /// Runs a hybrid search and attaches same-file related rows to each hit.
    pub async fn search_with_context(
        &mut self,
        kind: TableKind,
        query: &str,
        limit: usize,
    ) -> Result<Vec<EnrichedResult>> {
        self.search_with_context_n(kind, query, limit, DEFAULT_RELATED_PER_RESULT).await
    }

    pub async fn search_with_context_n(
        &mut self,
        kind: TableKind,
        query: &str,
        limit: usize,
        related_per_result: usize,
    ) -> Result<Vec<EnrichedResult>> {
        let results = self.hybrid.search(kind, query, limit).await?;
        let rows = self.manager.all_rows(kind).await;

        Ok(results
            .into_iter()
            .map(|result| {
                let related = same_file_neighbors(&rows, &result, related_per_result);
                EnrichedResult { result, related }
            })
            .collect())
    }

    /// Runs a search and packs the results (plus their related context)
    /// into a single [`ContextPackOutput`], dropping the lowest-scored
    /// items first once `max_chars` is exceeded.
    pub async fn build_context_pack(
        &mut self,
        kind: TableKind,
        query: &str,
        limit: usize,
    ) -> Result<ContextPackOutput> {
        self.build_context_pack_with_budget(kind, query, limit, DEFAULT_CONTEXT_PACK_MAX_CHARS).await
    }

    pub async fn build_context_pack_with_budget(
        &mut self,
        kind: TableKind,
        query: &str,
        limit: usize,
        max_chars: usize,
    ) -> Result<ContextPackOutput> {
        let enriched = self.search_with_context(kind, query, limit).await?;
        let model_id = match kind {
            TableKind::Code => self.manager.code_embedder().model_id().to_string(),
            TableKind::Docs => self.manager.docs_embedder().model_id().to_string(),
        };

        let mut items = Vec::new();
        let mut used_chars = 0usize;
        let mut dropped_items = 0usize;
        let mut truncated = false;

        for enriched_result in &enriched {
            let item = to_pack_item(&enriched_result.result, "result", None, None);
            let item_chars = item.content.len();
            if used_chars + item_chars > max_chars {
                truncated = true;
                dropped_items += 1;
                continue;
            }
            used_chars += item_chars;
            items.push(item);

            for (relation, related_result, distance) in &enriched_result.related {
                let related_item = to_pack_item(related_result, "related", Some(vec![relation.as_label().to_string()]), Some(*distance));
                let related_chars = related_item.content.len();
                if used_chars + related_chars > max_chars {
                    truncated = true;
                    dropped_items += 1;
                    continue;
                }
                used_chars += related_chars;
                items.push(related_item);
            }
        }

        Ok(ContextPackOutput {
            version: CONTEXT_PACK_VERSION,
            query: query.to_string(),
            model_id,
            profile: self.profile_name.clone(),
            items,
            budget: ContextPackBudget {
                max_chars,
                used_chars,
                truncated,
                dropped_items,
            },
            meta: None,
        })
    }
}

fn to_pack_item(
    result: &SearchResult,
    role: &str,
    relationship: Option<Vec<String>>,
    distance: Option<usize>,
) -> ContextPackItem {
    ContextPackItem {
        id: format!("{}:{}:{}", result.file, result.start_line, result.end_line),
        role: role.to_string(),
        file: result.file.clone(),
        start_line: result.start_line,
        end_line: result.end_line,
        symbol: result.symbol.clone(),
        chunk_type: result.symbol_type.clone(),
        score: result.score,
        imports: Vec::new(),
        content: result.content.clone(),
        relationship,
        distance,
    }
}

fn same_file_neighbors(
    rows: &[VectorRow],
    seed: &SearchResult,
    limit: usize,
) -> Vec<(RelatedContext, SearchResult, usize)> {
    let mut neighbors: Vec<(usize, &VectorRow)> = rows
        .iter()
        .filter(|row| row.path == seed.file && !(row.start_line == seed.start_line && row.end_line == seed.end_line))
        .map(|row| (line_distance(row, seed), row))
        .collect();

    neighbors.sort_by_key(|(distance, _)| *distance);
    neighbors
        .into_iter()
        .take(limit)
        .map(|(distance, row)| {
            let result = SearchResult {
                file: row.path.clone(),
                start_line: row.start_line,
                end_line: row.end_line,
                symbol: row.symbol_name.clone(),
                symbol_type: row.chunk_type.clone(),
                score: seed.score,
                content: row.text.clone(),
            };
            (RelatedContext::SameFile, result, distance)
        })
        .collect()
}

fn line_distance(row: &VectorRow, seed: &SearchResult) -> usize {
    if row.start_line >= seed.end_line {
        row.start_line - seed.end_line
    } else if seed.start_line >= row.end_line {
        seed.start_line - row.end_line
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(path: &str, start: usize, end: usize) -> VectorRow {
        VectorRow {
            id: format!("{path}:{start}"),
            path: path.to_string(),
            text: "fn x() {}".to_string(),
            vector: Vec::new(),
            start_line: start,
            end_line: end,
            content_hash: "h".to_string(),
            chunk_hash: "c".to_string(),
            chunk_type: Some("function".to_string()),
            symbol_name: Some("x".to_string()),
            has_documentation: false,
            tags: Vec::new(),
        }
    }

    fn result(file: &str, start: usize, end: usize) -> SearchResult {
        SearchResult {
            file: file.to_string(),
            start_line: start,
            end_line: end,
            symbol: Some("seed".to_string()),
            symbol_type: Some("function".to_string()),
            score: 0.9,
            content: "fn seed() {}".to_string(),
        }
    }

    #[test]
    fn picks_closest_same_file_rows_and_skips_the_seed_itself() {
        let rows = vec![
            row("src/lib.rs", 1, 5),
            row("src/lib.rs", 100, 120),
            row("src/other.rs", 1, 5),
        ];
        let seed = result("src/lib.rs", 10, 20);

        let neighbors = same_file_neighbors(&rows, &seed, 5);
        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0].1.start_line, 1);
        assert!(neighbors[0].2 < neighbors[1].2);
    }

    #[test]
    fn respects_related_per_result_limit() {
        let rows = vec![row("a.rs", 1, 2), row("a.rs", 3, 4), row("a.rs", 5, 6)];
        let seed = result("a.rs", 50, 60);
        let neighbors = same_file_neighbors(&rows, &seed, 1);
        assert_eq!(neighbors.len(), 1);
    }
}
