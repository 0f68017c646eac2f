//! Splits source files into semantically meaningful chunks for embedding
//! and full-text indexing: AST-aware where a tree-sitter grammar is
//! available, regex declaration boundaries otherwise, plus dedicated
//! Markdown and character-window strategies.

pub mod chunker;
pub mod comments;
pub mod config;
pub mod contextual_imports;
pub mod error;
pub mod language;
pub mod post_process;
pub mod strategies;
pub mod types;

pub use chunker::Chunker;
pub use comments::extract_doc_comments;
pub use config::{ChunkerConfig, ChunkingStrategy, OverlapStrategy};
pub use error::{ChunkerError, Result};
pub use language::Language;
pub use types::{ChunkMetadata, ChunkType, CodeChunk};
