use context_code_chunker::{Chunker, ChunkerConfig, ChunkType};
use context_fs::paths::safe_join;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// One function/method found in a file, for `getFileSummary`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSummary {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub is_async: bool,
    pub is_exported: bool,
    pub signature: Option<String>,
    pub docstring: Option<String>,
    pub complexity: Option<u32>,
}

/// One class/struct/trait/interface found in a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSummary {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub is_exported: bool,
    pub docstring: Option<String>,
    pub method_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSummaryResult {
    pub path: String,
    pub language: String,
    pub functions: Vec<FunctionSummary>,
    pub classes: Vec<ClassSummary>,
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    /// `None` when the file's language has no tree-sitter grammar; the
    /// summary is then the minimal form (just the line count in `functions`'
    /// absence is empty, `classes` empty, `imports`/`exports` empty).
    pub total_complexity: Option<u32>,
    pub line_count: usize,
}

const BRANCH_KEYWORDS: &[&str] = &["if ", "else", "match ", "switch", "for ", "while ", "case ", "catch", "&&", "||", "?"];

/// Rough cyclomatic-style complexity: one base point plus one per branch
/// keyword occurrence in the chunk's text. Not a real parse-based metric,
/// just a cheap per-function signal.
fn estimate_complexity(text: &str) -> u32 {
    let mut score = 1u32;
    for keyword in BRANCH_KEYWORDS {
        score += text.matches(keyword).count() as u32;
    }
    score
}

/// Builds a structural summary of `relative_path` under `root`, per spec
/// §6's `getFileSummary`. Languages without a tree-sitter grammar get the
/// minimal summary (metadata only, no functions/classes).
pub async fn summarize_file(
    root: &Path,
    relative_path: &str,
    include_complexity: bool,
    include_docstrings: bool,
) -> crate::error::Result<FileSummaryResult> {
    let absolute = safe_join(root, Path::new(relative_path)).map_err(|_| {
        crate::error::CoreError::new(crate::error::CoreErrorKind::FileNotFound, format!("path escapes project root: {relative_path}"))
    })?;
    let bytes = tokio::fs::read(&absolute).await?;
    let text = String::from_utf8_lossy(&bytes).to_string();
    let line_count = text.lines().count();

    let language = context_code_chunker::Language::from_path(&absolute);
    if !language.supports_ast() {
        return Ok(FileSummaryResult {
            path: relative_path.to_string(),
            language: language.as_str().to_string(),
            functions: Vec::new(),
            classes: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            total_complexity: None,
            line_count,
        });
    }

    let chunker = Chunker::new(ChunkerConfig::default());
    let chunks = chunker.chunk_str(&text, Some(relative_path))?;

    let mut functions = Vec::new();
    let mut classes = Vec::new();
    let mut imports = BTreeSet::new();
    let mut exports = BTreeSet::new();
    let mut total_complexity = 0u32;

    for chunk in &chunks {
        let meta = &chunk.metadata;
        for import in &meta.context_imports {
            imports.insert(import.clone());
        }
        let Some(chunk_type) = meta.chunk_type else {
            continue;
        };
        let name = meta.symbol_name.clone().unwrap_or_else(|| "<anonymous>".to_string());
        if meta.is_exported {
            exports.insert(name.clone());
        }

        match chunk_type {
            ChunkType::Function | ChunkType::Method => {
                let complexity = include_complexity.then(|| estimate_complexity(&chunk.content));
                if let Some(c) = complexity {
                    total_complexity += c;
                }
                functions.push(FunctionSummary {
                    name,
                    start_line: chunk.start_line,
                    end_line: chunk.end_line,
                    is_async: meta.is_async,
                    is_exported: meta.is_exported,
                    signature: meta.signature.clone(),
                    docstring: include_docstrings.then(|| meta.documentation.clone()).flatten(),
                    complexity,
                });
            }
            ChunkType::Class | ChunkType::Struct | ChunkType::Trait | ChunkType::Interface | ChunkType::Enum => {
                let method_count = chunks
                    .iter()
                    .filter(|c| {
                        matches!(c.metadata.chunk_type, Some(ChunkType::Method))
                            && c.metadata.parent_scope.as_deref() == Some(name.as_str())
                    })
                    .count();
                classes.push(ClassSummary {
                    name,
                    start_line: chunk.start_line,
                    end_line: chunk.end_line,
                    is_exported: meta.is_exported,
                    docstring: include_docstrings.then(|| meta.documentation.clone()).flatten(),
                    method_count,
                });
            }
            _ => {}
        }
    }

    Ok(FileSummaryResult {
        path: relative_path.to_string(),
        language: language.as_str().to_string(),
        functions,
        classes,
        imports: imports.into_iter().collect(),
        exports: exports.into_iter().collect(),
        total_complexity: include_complexity.then_some(total_complexity),
        line_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn summarizes_a_small_rust_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("lib.rs"),
            "pub fn add(a: i32, b: i32) -> i32 {\n    if a > b { a } else { b }\n}\n",
        )
        .unwrap();

        let summary = summarize_file(dir.path(), "lib.rs", true, true).await.unwrap();
        assert_eq!(summary.language, "rust");
        assert!(!summary.functions.is_empty());
        assert!(summary.total_complexity.unwrap() >= 1);
    }

    #[tokio::test]
    async fn unsupported_language_gets_a_minimal_summary() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "just some notes\nacross two lines\n").unwrap();

        let summary = summarize_file(dir.path(), "notes.txt", true, true).await.unwrap();
        assert!(summary.functions.is_empty());
        assert!(summary.classes.is_empty());
        assert_eq!(summary.total_complexity, None);
        assert_eq!(summary.line_count, 2);
    }
}
