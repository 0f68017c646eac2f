use crate::config::{ChunkerConfig, DOCS_OVERLAP_CHARS, DOCS_TARGET_CHARS};
use crate::language::Language;
use crate::strategies::character::split_character;
use crate::types::{ChunkMetadata, ChunkType, CodeChunk};

/// Extract doc-style comment blocks (`///`, `/** */`, `"""docstrings"""`,
/// `<!-- xmldoc -->`) from a code file into pseudo-doc chunks so they land in
/// the docs table under `[code-comment]<relative-path>`, searchable the same
/// way as real documentation. Always uses the character strategy regardless
/// of the host file's configured chunking strategy, per `ChunkerConfig`.
pub fn extract_doc_comments(file_path: &str, text: &str, language: Language) -> Vec<CodeChunk> {
    let doc_prefixes = doc_comment_prefixes(language);
    if doc_prefixes.is_empty() {
        return Vec::new();
    }

    let lines: Vec<&str> = text.lines().collect();
    let mut blocks: Vec<(usize, usize, String)> = Vec::new();
    let mut current_start: Option<usize> = None;
    let mut current_lines: Vec<&str> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        let is_doc = doc_prefixes.iter().any(|p| trimmed.starts_with(p));
        if is_doc {
            if current_start.is_none() {
                current_start = Some(idx);
            }
            current_lines.push(line);
        } else if let Some(start) = current_start.take() {
            blocks.push((start, idx - 1, current_lines.join("\n")));
            current_lines = Vec::new();
        }
    }
    if let Some(start) = current_start {
        blocks.push((start, lines.len() - 1, current_lines.join("\n")));
    }

    let pseudo_path = format!("[code-comment]{file_path}");
    let mut chunks = Vec::new();
    for (start, end, block_text) in blocks {
        if block_text.trim().len() < 8 {
            continue;
        }
        let sub = split_character(&pseudo_path, &block_text, DOCS_TARGET_CHARS, DOCS_OVERLAP_CHARS);
        for s in sub {
            chunks.push(CodeChunk::new(
                pseudo_path.clone(),
                start + s.start_line,
                start + s.end_line,
                s.content,
                ChunkMetadata::default()
                    .chunk_type(ChunkType::Comment)
                    .language(language.as_str()),
            ));
        }
    }

    chunks
}

fn doc_comment_prefixes(language: Language) -> &'static [&'static str] {
    match language {
        Language::Rust => &["///", "//!", "/**"],
        Language::Python => &["\"\"\"", "'''"],
        Language::JavaScript | Language::TypeScript | Language::Java | Language::CSharp => &["/**"],
        Language::Go => &["//"],
        _ => &[],
    }
}

#[must_use]
pub fn character_config_for_comments() -> ChunkerConfig {
    ChunkerConfig::character_only()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_rustdoc_block_as_pseudo_chunk() {
        let code = "/// This function does the thing.\n/// It really does.\npub fn do_thing() {}\n";
        let chunks = extract_doc_comments("lib.rs", code, Language::Rust);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.contains("does the thing"));
        assert!(chunks[0].file_path.starts_with("[code-comment]"));
    }

    #[test]
    fn ignores_non_doc_comments() {
        let code = "// just a regular comment\nfn f() {}\n";
        let chunks = extract_doc_comments("lib.rs", code, Language::Rust);
        assert!(chunks.is_empty());
    }
}
