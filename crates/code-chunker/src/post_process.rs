use crate::config::ChunkerConfig;
use crate::contextual_imports::{extract_imports_from_lines, filter_relevant_imports};
use crate::language::Language;
use crate::types::CodeChunk;

/// Applies the `include_imports` / `include_parent_context` /
/// `include_documentation` toggles uniformly across whichever strategy
/// produced the raw chunks, and fills `context_imports` by scanning the
/// whole file's import lines and keeping the ones a chunk's content
/// actually references.
pub fn apply(mut chunks: Vec<CodeChunk>, text: &str, language: Language, config: &ChunkerConfig) -> Vec<CodeChunk> {
    let lines: Vec<&str> = text.lines().collect();
    let file_imports = extract_imports_from_lines(language, &lines, 200);

    for chunk in &mut chunks {
        if !config.include_documentation {
            chunk.metadata.documentation = None;
        }

        if !config.include_parent_context {
            chunk.metadata.parent_scope = None;
            chunk.metadata.qualified_name = chunk.metadata.symbol_name.clone();
        }

        chunk.metadata.context_imports = if config.include_imports {
            filter_relevant_imports(language, &file_imports, &chunk.content, config.max_imports_per_chunk)
        } else {
            Vec::new()
        };
    }

    chunks
}
