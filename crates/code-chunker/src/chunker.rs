use crate::config::{
    ChunkerConfig, ChunkingStrategy, CODE_OVERLAP_CHARS, CODE_TARGET_CHARS, MAX_CHUNKS_PER_FILE,
};
use crate::error::Result;
use crate::language::Language;
use crate::post_process;
use crate::strategies::{ast, character, code_aware, line_count, markdown};
use crate::types::CodeChunk;

/// Strategy-dispatched splitter. One `Chunker` is typically constructed per
/// indexing run (or reused across calls — it holds no per-file state).
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    #[must_use]
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Chunk raw text. `path_hint` (relative or absolute) is used only for
    /// language detection and to stamp `file_path` on the resulting chunks;
    /// it need not point at a file that exists.
    pub fn chunk_str(&self, text: &str, path_hint: Option<&str>) -> Result<Vec<CodeChunk>> {
        let file_path = path_hint.unwrap_or("untitled").to_string();
        let language = path_hint
            .map(Language::from_path)
            .unwrap_or(Language::Unknown);

        let raw = self.dispatch(&file_path, text, language)?;
        let merged = merge_small_chunks(raw, self.config.min_chunk_tokens);
        let mut chunks = post_process::apply(merged, text, language, &self.config);

        if chunks.len() > MAX_CHUNKS_PER_FILE {
            log::warn!(
                "{file_path}: chunk count {} exceeds cap {MAX_CHUNKS_PER_FILE}, truncating",
                chunks.len()
            );
            chunks.truncate(MAX_CHUNKS_PER_FILE);
        }

        Ok(chunks)
    }

    fn dispatch(&self, file_path: &str, text: &str, language: Language) -> Result<Vec<CodeChunk>> {
        if language == Language::Markdown {
            return Ok(markdown::split_markdown(file_path, text));
        }

        let target = self.config.target_chunk_tokens.max(1);
        let max = self.config.max_chunk_tokens.max(target);
        let overlap = match self.config.overlap {
            crate::config::OverlapStrategy::None => 0,
            _ => CODE_OVERLAP_CHARS.min(target / 2),
        };

        match self.config.strategy {
            ChunkingStrategy::Character => {
                Ok(character::split_character(file_path, text, target, overlap))
            }
            ChunkingStrategy::LineCount => {
                // target_chunk_tokens is a character budget everywhere else; for the
                // line-granular strategy approximate lines-per-chunk as half that
                // number, which roughly matches this codebase's average line length.
                let lines_per_chunk = (target / 2).max(1);
                Ok(line_count::split_line_count(file_path, text, lines_per_chunk))
            }
            ChunkingStrategy::Markdown => Ok(markdown::split_markdown(file_path, text)),
            ChunkingStrategy::Ast => Ok(self.ast_with_fallback(file_path, text, language, target, max, overlap)),
            ChunkingStrategy::CodeAware => {
                if language.supports_ast() {
                    Ok(self.ast_with_fallback(file_path, text, language, target, max, overlap))
                } else {
                    Ok(code_aware::split_code_aware(
                        file_path, text, language, target, max, overlap,
                    ))
                }
            }
        }
    }

    fn ast_with_fallback(
        &self,
        file_path: &str,
        text: &str,
        language: Language,
        target: usize,
        max: usize,
        overlap: usize,
    ) -> Vec<CodeChunk> {
        if !language.supports_ast() {
            return code_aware::split_code_aware(file_path, text, language, target, max, overlap);
        }
        match ast::split_ast(file_path, text, language) {
            Ok(chunks) if !chunks.is_empty() => chunks,
            Ok(_) => code_aware::split_code_aware(file_path, text, language, target, max, overlap),
            Err(e) => {
                log::warn!("{file_path}: AST parse failed ({e}), falling back to code-aware");
                code_aware::split_code_aware(file_path, text, language, target, max, overlap)
            }
        }
    }
}

/// Merge a chunk into its successor when its content is shorter than
/// `min_tokens` (interpreted as characters here), so a stray one-line
/// declaration doesn't become its own near-empty embedding. `min_tokens ==
/// 0` disables merging entirely. Never merges a chunk that already carries
/// a symbol name — those came from a declaration boundary on purpose and
/// losing their identity would break parent-scope/qualified-name lookups.
fn merge_small_chunks(chunks: Vec<CodeChunk>, min_tokens: usize) -> Vec<CodeChunk> {
    if min_tokens == 0 || chunks.len() < 2 {
        return chunks;
    }

    let mut out: Vec<CodeChunk> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if let Some(prev) = out.last_mut() {
            let prev_mergeable = prev.metadata.symbol_name.is_none();
            if prev_mergeable && prev.content.trim().len() < min_tokens && prev.file_path == chunk.file_path {
                prev.end_line = chunk.end_line;
                prev.content = format!("{}\n{}", prev.content, chunk.content);
                prev.chunk_hash = context_fs::hash::chunk_hash(&prev.content);
                continue;
            }
        }
        out.push(chunk);
    }
    out
}

pub const DEFAULT_CODE_TARGET: usize = CODE_TARGET_CHARS;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_ast_for_rust() {
        let code = "pub fn one() -> i32 {\n    1\n}\n";
        let chunks = Chunker::new(ChunkerConfig::default())
            .chunk_str(code, Some("a.rs"))
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0].metadata.symbol_name.as_deref(),
            Some("one")
        );
    }

    #[test]
    fn unknown_language_falls_back_to_character() {
        let chunks = Chunker::new(ChunkerConfig::default())
            .chunk_str("plain text\nwith two lines\n", Some("a.xyz"))
            .unwrap();
        assert_eq!(chunks.len(), 1);
    }
}
