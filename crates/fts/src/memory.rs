use crate::engine::FtsHit;
use crate::error::Result;
use crate::tokenize::tokenize;
use context_code_chunker::CodeChunk;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize, Deserialize)]
struct SerializedIndex {
    doc_lengths: HashMap<String, usize>,
    doc_paths: HashMap<String, String>,
    postings: Vec<(String, HashMap<String, u32>)>,
}

/// Okapi BM25 tuning. k1/b mirror values used elsewhere in this corpus for
/// code search: a lower k1 than the textbook 1.2 keeps repeated identifiers
/// (`id`, `id`, `id`...) from dominating a match, and a lower b than 0.75
/// under-penalizes long files relative to prose.
const K1: f32 = 0.8;
const B: f32 = 0.5;

#[derive(Default)]
struct Posting {
    /// document id -> term frequency within that document
    term_freq: HashMap<String, u32>,
}

/// In-memory inverted-index BM25 engine. Rebuilds its own posting lists on
/// every mutation rather than supporting true incremental term removal,
/// which keeps the scoring math simple at the cost of O(doc terms) per
/// delete — acceptable at the JS-style engine's intended scale.
#[derive(Default)]
pub struct MemoryFtsEngine {
    postings: HashMap<String, Posting>,
    doc_lengths: HashMap<String, usize>,
    doc_paths: HashMap<String, String>,
    total_length: usize,
}

impl MemoryFtsEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn avg_doc_length(&self) -> f32 {
        if self.doc_lengths.is_empty() {
            return 0.0;
        }
        self.total_length as f32 / self.doc_lengths.len() as f32
    }

    pub fn add_chunks(&mut self, chunks: &[CodeChunk]) {
        for chunk in chunks {
            self.remove_doc(&chunk.id);
            let tokens = tokenize(&chunk.content);
            self.total_length += tokens.len();
            self.doc_lengths.insert(chunk.id.clone(), tokens.len());
            self.doc_paths.insert(chunk.id.clone(), chunk.file_path.clone());

            let mut freq: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *freq.entry(token).or_insert(0) += 1;
            }
            for (term, count) in freq {
                self.postings
                    .entry(term)
                    .or_default()
                    .term_freq
                    .insert(chunk.id.clone(), count);
            }
        }
    }

    pub fn remove_by_path(&mut self, path: &str) {
        let ids: Vec<String> = self
            .doc_paths
            .iter()
            .filter(|(_, p)| p.as_str() == path)
            .map(|(id, _)| id.clone())
            .collect();
        for id in ids {
            self.remove_doc(&id);
        }
    }

    fn remove_doc(&mut self, id: &str) {
        if let Some(len) = self.doc_lengths.remove(id) {
            self.total_length -= len;
        }
        self.doc_paths.remove(id);
        for posting in self.postings.values_mut() {
            posting.term_freq.remove(id);
        }
        self.postings.retain(|_, p| !p.term_freq.is_empty());
    }

    #[must_use]
    pub fn search(&self, query: &str, top_k: usize) -> Vec<FtsHit> {
        let n = self.doc_lengths.len();
        if n == 0 {
            return Vec::new();
        }
        let avg_len = self.avg_doc_length();
        let terms = tokenize(query);

        let mut scores: HashMap<String, f32> = HashMap::new();
        for term in &terms {
            let Some(posting) = self.postings.get(term) else {
                continue;
            };
            let doc_freq = posting.term_freq.len();
            if doc_freq == 0 {
                continue;
            }
            let idf = (((n as f32 - doc_freq as f32 + 0.5) / (doc_freq as f32 + 0.5)) + 1.0).ln();
            for (doc_id, &tf) in &posting.term_freq {
                let doc_len = self.doc_lengths.get(doc_id).copied().unwrap_or(0) as f32;
                let norm = 1.0 - B + B * (doc_len / avg_len.max(1.0));
                let score = idf * (tf as f32 * (K1 + 1.0)) / (tf as f32 + K1 * norm);
                *scores.entry(doc_id.clone()).or_insert(0.0) += score;
            }
        }

        let mut hits: Vec<FtsHit> = scores
            .into_iter()
            .map(|(id, score)| FtsHit { id, score })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        hits
    }

    #[must_use]
    pub fn total_chunks(&self) -> usize {
        self.doc_lengths.len()
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let snapshot = SerializedIndex {
            doc_lengths: self.doc_lengths.clone(),
            doc_paths: self.doc_paths.clone(),
            postings: self
                .postings
                .iter()
                .map(|(term, posting)| (term.clone(), posting.term_freq.clone()))
                .collect(),
        };
        Ok(serde_json::to_vec(&snapshot)?)
    }

    pub fn deserialize(blob: &[u8]) -> Result<Self> {
        let snapshot: SerializedIndex = serde_json::from_slice(blob)?;
        let total_length = snapshot.doc_lengths.values().sum();
        let postings = snapshot
            .postings
            .into_iter()
            .map(|(term, term_freq)| (term, Posting { term_freq }))
            .collect();
        Ok(Self {
            postings,
            doc_lengths: snapshot.doc_lengths,
            doc_paths: snapshot.doc_paths,
            total_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_code_chunker::ChunkMetadata;

    fn chunk(id: &str, path: &str, content: &str) -> CodeChunk {
        let mut c = CodeChunk::new(path.to_string(), 1, 1, content.to_string(), ChunkMetadata::default());
        c.id = id.to_string();
        c
    }

    #[test]
    fn finds_matching_document_by_keyword() {
        let mut engine = MemoryFtsEngine::new();
        engine.add_chunks(&[
            chunk("1", "a.rs", "fn get_user_by_id(id: i32) -> User"),
            chunk("2", "b.rs", "struct DatabaseConnection"),
        ]);

        let hits = engine.search("get user", 10);
        assert_eq!(hits[0].id, "1");
    }

    #[test]
    fn remove_by_path_drops_all_its_chunks() {
        let mut engine = MemoryFtsEngine::new();
        engine.add_chunks(&[
            chunk("1", "a.rs", "fn one"),
            chunk("2", "a.rs", "fn two"),
            chunk("3", "b.rs", "fn three"),
        ]);
        engine.remove_by_path("a.rs");
        assert_eq!(engine.total_chunks(), 1);
    }

    #[test]
    fn round_trips_through_serialize_deserialize() {
        let mut engine = MemoryFtsEngine::new();
        engine.add_chunks(&[chunk("1", "a.rs", "fn get_user")]);
        let blob = engine.serialize().unwrap();
        let restored = MemoryFtsEngine::deserialize(&blob).unwrap();
        assert_eq!(restored.total_chunks(), 1);
        assert_eq!(restored.search("get user", 5)[0].id, "1");
    }
}
