use crate::language::Language;
use crate::strategies::character::split_character;
use crate::types::{ChunkMetadata, ChunkType, CodeChunk};
use once_cell::sync::Lazy;
use regex::Regex;

/// Regex-driven boundary detection: find lines that look like the start of a
/// top-level declaration for `language`, then carve the file into spans
/// running from one boundary to the next (or EOF). Declarations that don't
/// fit in `max_chars` are recursively split with the character strategy so a
/// single giant function never becomes one unembeddable chunk.
pub fn split_code_aware(
    file_path: &str,
    text: &str,
    language: Language,
    target_chars: usize,
    max_chars: usize,
    overlap_chars: usize,
) -> Vec<CodeChunk> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let boundaries = boundary_lines(&lines, language);
    if boundaries.is_empty() {
        return split_character(file_path, text, target_chars, overlap_chars);
    }

    let mut spans: Vec<(usize, usize)> = Vec::new();
    if boundaries[0] > 0 {
        spans.push((0, boundaries[0]));
    }
    for (i, &start) in boundaries.iter().enumerate() {
        let end = boundaries.get(i + 1).copied().unwrap_or(lines.len());
        spans.push((start, end));
    }

    let mut chunks = Vec::new();
    for (start_idx, end_idx_exclusive) in spans {
        if start_idx >= end_idx_exclusive {
            continue;
        }
        let content = lines[start_idx..end_idx_exclusive].join("\n");
        if content.len() > max_chars {
            let sub_text = content.clone();
            let sub_chunks = split_character(file_path, &sub_text, target_chars, overlap_chars);
            for sub in sub_chunks {
                chunks.push(CodeChunk::new(
                    file_path.to_string(),
                    start_idx + sub.start_line,
                    start_idx + sub.end_line,
                    sub.content,
                    ChunkMetadata::default()
                        .chunk_type(ChunkType::Other)
                        .language(language.as_str()),
                ));
            }
            continue;
        }
        let chunk_type = classify_boundary(lines[start_idx], language);
        chunks.push(CodeChunk::new(
            file_path.to_string(),
            start_idx + 1,
            end_idx_exclusive,
            content,
            ChunkMetadata::default()
                .chunk_type(chunk_type)
                .language(language.as_str()),
        ));
    }

    chunks
}

fn boundary_lines(lines: &[&str], language: Language) -> Vec<usize> {
    let pattern = declaration_pattern(language);
    let mut out = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if pattern.is_match(line) {
            out.push(idx);
        }
    }
    out
}

fn classify_boundary(line: &str, language: Language) -> ChunkType {
    let trimmed = line.trim_start();
    match language {
        Language::Rust => {
            if trimmed.contains("fn ") {
                ChunkType::Function
            } else if trimmed.contains("struct ") {
                ChunkType::Struct
            } else if trimmed.contains("enum ") {
                ChunkType::Enum
            } else if trimmed.contains("trait ") {
                ChunkType::Trait
            } else if trimmed.contains("impl ") || trimmed.starts_with("impl") {
                ChunkType::Impl
            } else if trimmed.contains("mod ") {
                ChunkType::Module
            } else {
                ChunkType::Other
            }
        }
        Language::Python => {
            if trimmed.starts_with("class ") {
                ChunkType::Class
            } else if trimmed.starts_with("def ") || trimmed.starts_with("async def ") {
                ChunkType::Function
            } else {
                ChunkType::Other
            }
        }
        Language::JavaScript | Language::TypeScript => {
            if trimmed.contains("class ") {
                ChunkType::Class
            } else if trimmed.contains("interface ") {
                ChunkType::Interface
            } else if trimmed.contains("function") || trimmed.contains("=>") {
                ChunkType::Function
            } else {
                ChunkType::Other
            }
        }
        Language::Go => {
            if trimmed.starts_with("func ") {
                if trimmed.starts_with("func (") {
                    ChunkType::Method
                } else {
                    ChunkType::Function
                }
            } else if trimmed.starts_with("type ") && trimmed.contains("struct") {
                ChunkType::Struct
            } else if trimmed.starts_with("type ") && trimmed.contains("interface") {
                ChunkType::Interface
            } else {
                ChunkType::Other
            }
        }
        _ => ChunkType::Other,
    }
}

/// Language-keyed boundary regex covering the ~22 languages the filter
/// policy and chunker recognize. Unsupported/unknown languages fall back to
/// an empty pattern, pushing callers onto the character strategy.
fn declaration_pattern(language: Language) -> &'static Regex {
    static RUST: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^\s*(pub(\([^)]*\))?\s+)?(async\s+)?(unsafe\s+)?(fn|struct|enum|trait|impl|mod)\s").unwrap()
    });
    static PYTHON: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^\s*(async\s+def|def|class)\s").unwrap());
    static JS_TS: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^\s*(export\s+)?(default\s+)?(async\s+)?(function\b|class\b|interface\b|const\s+\w+\s*=\s*(async\s*)?\()",
        )
        .unwrap()
    });
    static GO: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(func|type)\s").unwrap());
    static JAVA_LIKE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^\s*(public|private|protected|internal)?\s*(static\s+)?(final\s+)?(class|interface|enum|struct|void|[A-Za-z_<>\[\],\s]+)\s+\w+\s*\(",
        )
        .unwrap()
    });
    static RUBY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(def|class|module)\s").unwrap());
    static GENERIC: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^\s*(function|def|fn|class|struct|interface)\s").unwrap());
    static EMPTY: Lazy<Regex> = Lazy::new(|| Regex::new(r"$^").unwrap());

    match language {
        Language::Rust => &RUST,
        Language::Python => &PYTHON,
        Language::JavaScript | Language::TypeScript => &JS_TS,
        Language::Go => &GO,
        Language::Java | Language::CSharp | Language::Cpp | Language::C => &JAVA_LIKE,
        Language::Ruby => &RUBY,
        Language::Swift | Language::Kotlin => &GENERIC,
        _ => &EMPTY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_rust_functions_at_declarations() {
        let code = "use std::fmt;\n\nfn one() {\n    1\n}\n\nfn two() {\n    2\n}\n";
        let chunks = split_code_aware("a.rs", code, Language::Rust, 4000, 8000, 200);
        assert!(chunks.iter().any(|c| c.content.contains("fn one")));
        assert!(chunks.iter().any(|c| c.content.contains("fn two")));
    }

    #[test]
    fn falls_back_to_character_for_unknown_language() {
        let code = "just\nsome\nplain\ntext\n";
        let chunks = split_code_aware("a.txt", code, Language::Unknown, 4000, 8000, 200);
        assert!(!chunks.is_empty());
    }

    #[test]
    fn oversized_declaration_is_split_further() {
        let mut code = String::from("fn huge() {\n");
        for i in 0..2000 {
            code.push_str(&format!("    let x{i} = {i};\n"));
        }
        code.push_str("}\n");
        let chunks = split_code_aware("huge.rs", &code, Language::Rust, 500, 1000, 100);
        assert!(chunks.len() > 1);
    }
}
