use serde::{Deserialize, Serialize};

/// What kind of declaration (or section) a chunk came from. Drives ranker
/// boosts and metadata display; `priority()` is the coarse fallback weight
/// used when a type has no bespoke boost rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChunkType {
    Function,
    Method,
    Struct,
    Class,
    Enum,
    Interface,
    Trait,
    Impl,
    Module,
    Variable,
    Const,
    Type,
    Macro,
    Section,
    Comment,
    Other,
}

impl ChunkType {
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Function => 90,
            Self::Method => 88,
            Self::Class => 80,
            Self::Struct => 78,
            Self::Trait => 74,
            Self::Interface => 72,
            Self::Enum => 70,
            Self::Impl => 65,
            Self::Type => 60,
            Self::Macro => 55,
            Self::Section => 48,
            Self::Module => 45,
            Self::Const => 40,
            Self::Variable => 35,
            Self::Comment => 20,
            Self::Other => 30,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Struct => "struct",
            Self::Class => "class",
            Self::Enum => "enum",
            Self::Interface => "interface",
            Self::Trait => "trait",
            Self::Impl => "impl",
            Self::Module => "module",
            Self::Variable => "variable",
            Self::Const => "const",
            Self::Type => "type",
            Self::Macro => "macro",
            Self::Section => "section",
            Self::Comment => "comment",
            Self::Other => "other",
        }
    }
}

/// Everything the ranker and the caller might want to know about a chunk
/// beyond its raw text. Built with the setter-style builder below so call
/// sites read as a declarative list of what's known.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub chunk_type: Option<ChunkType>,
    pub symbol_name: Option<String>,
    pub qualified_name: Option<String>,
    pub parent_scope: Option<String>,
    pub signature: Option<String>,
    pub documentation: Option<String>,
    pub decorators: Vec<String>,
    pub tags: Vec<String>,
    pub language: Option<String>,
    pub visibility: Option<String>,
    pub is_async: bool,
    pub is_static: bool,
    pub is_exported: bool,
    pub parameter_count: Option<u32>,
    pub return_type: Option<String>,
    pub generic_parameters: Vec<String>,
    pub context_imports: Vec<String>,
    pub header_path: Option<String>,
    pub header_level: Option<u8>,
    pub part: Option<u32>,
    pub total_parts: Option<u32>,
    /// Cross-cutting labels assigned post-chunking (e.g. by a task-pack
    /// bundler); empty for a chunk fresh out of a strategy.
    pub bundle_tags: Vec<String>,
    /// Other relative paths the indexer has associated with this chunk
    /// (e.g. a test file's subject, or a doc's covered source files).
    pub related_paths: Vec<String>,
}

impl ChunkMetadata {
    #[must_use]
    pub fn chunk_type(mut self, value: ChunkType) -> Self {
        self.chunk_type = Some(value);
        self
    }

    #[must_use]
    pub fn symbol_name(mut self, value: impl Into<String>) -> Self {
        self.symbol_name = Some(value.into());
        self
    }

    #[must_use]
    pub fn qualified_name(mut self, value: impl Into<String>) -> Self {
        self.qualified_name = Some(value.into());
        self
    }

    #[must_use]
    pub fn parent_scope(mut self, value: impl Into<String>) -> Self {
        self.parent_scope = Some(value.into());
        self
    }

    #[must_use]
    pub fn signature(mut self, value: impl Into<String>) -> Self {
        self.signature = Some(value.into());
        self
    }

    #[must_use]
    pub fn documentation(mut self, value: impl Into<String>) -> Self {
        self.documentation = Some(value.into());
        self
    }

    #[must_use]
    pub fn language(mut self, value: impl Into<String>) -> Self {
        self.language = Some(value.into());
        self
    }

    #[must_use]
    pub fn visibility(mut self, value: impl Into<String>) -> Self {
        self.visibility = Some(value.into());
        self
    }

    #[must_use]
    pub fn context_imports(mut self, value: Vec<String>) -> Self {
        self.context_imports = value;
        self
    }

    #[must_use]
    pub fn header_path(mut self, value: impl Into<String>) -> Self {
        self.header_path = Some(value.into());
        self
    }

    #[must_use]
    pub fn header_level(mut self, value: u8) -> Self {
        self.header_level = Some(value);
        self
    }

    #[must_use]
    pub fn part(mut self, part: u32, total_parts: u32) -> Self {
        self.part = Some(part);
        self.total_parts = Some(total_parts);
        self
    }

    #[must_use]
    pub fn bundle_tags(mut self, value: Vec<String>) -> Self {
        self.bundle_tags = value;
        self
    }

    #[must_use]
    pub fn related_paths(mut self, value: Vec<String>) -> Self {
        self.related_paths = value;
        self
    }
}

/// A contiguous text span from a source file, with a stable id and the
/// position-independent hash used for move detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeChunk {
    pub id: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    pub chunk_hash: String,
    pub metadata: ChunkMetadata,
}

impl CodeChunk {
    #[must_use]
    pub fn new(
        file_path: String,
        start_line: usize,
        end_line: usize,
        content: String,
        metadata: ChunkMetadata,
    ) -> Self {
        let chunk_hash = context_fs::hash::chunk_hash(&content);
        let id = stable_chunk_id(&file_path, &chunk_hash, start_line);
        Self {
            id,
            file_path,
            start_line,
            end_line,
            content,
            chunk_hash,
            metadata,
        }
    }
}

/// Deterministic id derived from path + content hash + position, so the same
/// logical chunk gets the same id across re-chunking runs (required for
/// idempotent `insertBatch`).
fn stable_chunk_id(file_path: &str, chunk_hash: &str, start_line: usize) -> String {
    let seed = format!("{file_path}:{start_line}:{chunk_hash}");
    let digest = context_fs::hash::content_hash(seed.as_bytes());
    format!(
        "{}-{}-{}-{}-{}",
        &digest[0..8],
        &digest[8..12],
        &digest[12..16],
        &digest[16..20],
        &digest[20..32]
    )
}
