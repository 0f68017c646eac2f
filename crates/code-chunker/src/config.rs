use crate::language::Language;

/// Which splitter produces the chunks for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkingStrategy {
    /// Recursive character splitter, the universal fallback.
    Character,
    /// Regex-driven declaration boundaries, language-keyed.
    #[default]
    CodeAware,
    /// Tree-sitter powered, falls back to `CodeAware` on parse failure.
    Ast,
    /// Header-aware splitting for Markdown and friends.
    Markdown,
    /// Fixed line-count windows; mainly used by tests and as a last-resort
    /// strategy for languages with no other dispatch.
    LineCount,
}

/// How consecutive chunks overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapStrategy {
    /// No overlap between chunks.
    None,
    /// A fixed-size tail of the previous chunk prefixes the next.
    #[default]
    Fixed,
    /// Like `Fixed`, but also infers which imports are relevant to the
    /// following chunk instead of duplicating raw overlap text.
    Contextual,
}

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub strategy: ChunkingStrategy,
    pub overlap: OverlapStrategy,
    pub target_chunk_tokens: usize,
    pub max_chunk_tokens: usize,
    pub min_chunk_tokens: usize,
    pub include_imports: bool,
    pub include_parent_context: bool,
    pub include_documentation: bool,
    pub max_imports_per_chunk: usize,
    pub supported_languages: Vec<Language>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkingStrategy::CodeAware,
            overlap: OverlapStrategy::Fixed,
            target_chunk_tokens: 4000,
            max_chunk_tokens: 8000,
            min_chunk_tokens: 20,
            include_imports: true,
            include_parent_context: true,
            include_documentation: true,
            max_imports_per_chunk: 5,
            supported_languages: Vec::new(),
        }
    }
}

impl ChunkerConfig {
    /// The production default: AST where supported, code-aware elsewhere,
    /// tuned for embedding quality rather than raw speed.
    #[must_use]
    pub fn for_embeddings() -> Self {
        Self {
            strategy: ChunkingStrategy::Ast,
            ..Self::default()
        }
    }

    /// Pure character-strategy config; used by callers (tests, the comment
    /// extractor) that want the universal fallback regardless of language.
    #[must_use]
    pub fn character_only() -> Self {
        Self {
            strategy: ChunkingStrategy::Character,
            overlap: OverlapStrategy::Fixed,
            target_chunk_tokens: 4000,
            max_chunk_tokens: 8000,
            ..Self::default()
        }
    }

    /// Docs variant of the character strategy: larger windows, larger
    /// overlap, per spec's `8000/2000` docs target.
    #[must_use]
    pub fn for_docs() -> Self {
        Self {
            strategy: ChunkingStrategy::Markdown,
            target_chunk_tokens: 8000,
            max_chunk_tokens: 16_000,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn supports(&self, language: Language) -> bool {
        self.supported_languages.is_empty() || self.supported_languages.contains(&language)
    }
}

pub const CODE_OVERLAP_CHARS: usize = 800;
pub const DOCS_OVERLAP_CHARS: usize = 2000;
pub const CODE_TARGET_CHARS: usize = 4000;
pub const DOCS_TARGET_CHARS: usize = 8000;
pub const MAX_CHUNKS_PER_FILE: usize = 1000;
