use crate::error::{ChunkerError, Result};
use crate::language::Language;
use crate::types::{ChunkMetadata, ChunkType, CodeChunk};
use tree_sitter::{Node, Parser};

/// Walk a tree-sitter parse tree and emit one chunk per named declaration
/// (functions, methods, classes, structs, traits, interfaces, enums,
/// modules). Rust, Python, JavaScript and TypeScript get a full recursive
/// walk that threads parent scope through nested impls/classes; the other
/// six grammars get a shallower top-level pass (see `generic_top_level`).
pub fn split_ast(file_path: &str, text: &str, language: Language) -> Result<Vec<CodeChunk>> {
    let mut parser = Parser::new();
    let ts_language = language.tree_sitter_language()?;
    parser
        .set_language(&ts_language)
        .map_err(|e| ChunkerError::ParseFailed {
            path: file_path.to_string(),
            detail: e.to_string(),
        })?;

    let tree = parser.parse(text, None).ok_or_else(|| ChunkerError::ParseFailed {
        path: file_path.to_string(),
        detail: "tree-sitter returned no tree".to_string(),
    })?;

    let root = tree.root_node();
    if root.has_error() && root.child_count() == 0 {
        return Err(ChunkerError::ParseFailed {
            path: file_path.to_string(),
            detail: "syntax error at root".to_string(),
        });
    }

    let mut chunks = Vec::new();
    match language {
        Language::Rust => walk_rust(root, text, None, file_path, &mut chunks),
        Language::Python => walk_python(root, text, None, file_path, &mut chunks),
        Language::JavaScript | Language::TypeScript => {
            walk_js(root, text, None, file_path, language, &mut chunks);
        }
        _ => generic_top_level(root, text, file_path, language, &mut chunks),
    }

    Ok(chunks)
}

fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or_default()
}

fn node_span(node: Node) -> (usize, usize) {
    (node.start_position().row + 1, node.end_position().row + 1)
}

fn field_text<'a>(node: Node, field: &str, source: &'a str) -> Option<&'a str> {
    node.child_by_field_name(field).map(|n| node_text(n, source))
}

fn leading_doc_comment(node: Node, source: &str, prefixes: &[&str]) -> Option<String> {
    let mut doc_lines = Vec::new();
    let mut cursor = node;
    while let Some(prev) = cursor.prev_sibling() {
        let kind = prev.kind();
        if kind != "line_comment" && kind != "comment" && kind != "block_comment" {
            break;
        }
        let text = node_text(prev, source).trim();
        if !prefixes.iter().any(|p| text.starts_with(p)) {
            break;
        }
        doc_lines.push(text.to_string());
        cursor = prev;
    }
    if doc_lines.is_empty() {
        return None;
    }
    doc_lines.reverse();
    Some(doc_lines.join("\n"))
}

fn push_chunk(
    chunks: &mut Vec<CodeChunk>,
    file_path: &str,
    node: Node,
    source: &str,
    chunk_type: ChunkType,
    name: Option<&str>,
    parent_scope: Option<&str>,
    language: Language,
    documentation: Option<String>,
) {
    let (start_line, end_line) = node_span(node);
    let mut metadata = ChunkMetadata::default()
        .chunk_type(chunk_type)
        .language(language.as_str());
    if let Some(name) = name {
        metadata = metadata.symbol_name(name);
        let qualified = match parent_scope {
            Some(p) => format!("{p}::{name}"),
            None => name.to_string(),
        };
        metadata = metadata.qualified_name(qualified);
    }
    if let Some(p) = parent_scope {
        metadata = metadata.parent_scope(p);
    }
    if let Some(doc) = documentation {
        metadata = metadata.documentation(doc);
    }
    chunks.push(CodeChunk::new(
        file_path.to_string(),
        start_line,
        end_line,
        node_text(node, source).to_string(),
        metadata,
    ));
}

fn walk_rust(node: Node, source: &str, parent_scope: Option<&str>, file_path: &str, chunks: &mut Vec<CodeChunk>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "function_item" => {
                let name = field_text(child, "name", source);
                let chunk_type = if parent_scope.is_some() {
                    ChunkType::Method
                } else {
                    ChunkType::Function
                };
                let doc = leading_doc_comment(child, source, &["///", "//!", "/**"]);
                push_chunk(chunks, file_path, child, source, chunk_type, name, parent_scope, Language::Rust, doc);
            }
            "struct_item" => {
                let name = field_text(child, "name", source);
                let doc = leading_doc_comment(child, source, &["///", "//!", "/**"]);
                push_chunk(chunks, file_path, child, source, ChunkType::Struct, name, None, Language::Rust, doc);
            }
            "enum_item" => {
                let name = field_text(child, "name", source);
                let doc = leading_doc_comment(child, source, &["///", "//!", "/**"]);
                push_chunk(chunks, file_path, child, source, ChunkType::Enum, name, None, Language::Rust, doc);
            }
            "trait_item" => {
                let name = field_text(child, "name", source);
                let doc = leading_doc_comment(child, source, &["///", "//!", "/**"]);
                push_chunk(chunks, file_path, child, source, ChunkType::Trait, name, None, Language::Rust, doc);
                if let Some(body) = child.child_by_field_name("body") {
                    walk_rust(body, source, name, file_path, chunks);
                }
            }
            "impl_item" => {
                let self_type = field_text(child, "type", source);
                if let Some(body) = child.child_by_field_name("body") {
                    walk_rust(body, source, self_type, file_path, chunks);
                }
            }
            "mod_item" => {
                if let Some(body) = child.child_by_field_name("body") {
                    walk_rust(body, source, None, file_path, chunks);
                }
            }
            _ => {}
        }
    }
}

fn walk_python(node: Node, source: &str, parent_scope: Option<&str>, file_path: &str, chunks: &mut Vec<CodeChunk>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "function_definition" => {
                let name = field_text(child, "name", source);
                let chunk_type = if parent_scope.is_some() {
                    ChunkType::Method
                } else {
                    ChunkType::Function
                };
                let doc = python_docstring(child, source);
                push_chunk(chunks, file_path, child, source, chunk_type, name, parent_scope, Language::Python, doc);
            }
            "class_definition" => {
                let name = field_text(child, "name", source);
                let doc = python_docstring(child, source);
                push_chunk(chunks, file_path, child, source, ChunkType::Class, name, None, Language::Python, doc);
                if let Some(body) = child.child_by_field_name("body") {
                    walk_python(body, source, name, file_path, chunks);
                }
            }
            _ => {}
        }
    }
}

fn python_docstring(node: Node, source: &str) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = first.named_child(0)?;
    if expr.kind() == "string" {
        Some(node_text(expr, source).trim().to_string())
    } else {
        None
    }
}

fn walk_js(
    node: Node,
    source: &str,
    parent_scope: Option<&str>,
    file_path: &str,
    language: Language,
    chunks: &mut Vec<CodeChunk>,
) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "function_declaration" => {
                let name = field_text(child, "name", source);
                push_chunk(chunks, file_path, child, source, ChunkType::Function, name, parent_scope, language, None);
            }
            "method_definition" => {
                let name = field_text(child, "name", source);
                push_chunk(chunks, file_path, child, source, ChunkType::Method, name, parent_scope, language, None);
            }
            "class_declaration" => {
                let name = field_text(child, "name", source);
                push_chunk(chunks, file_path, child, source, ChunkType::Class, name, None, language, None);
                if let Some(body) = child.child_by_field_name("body") {
                    walk_js(body, source, name, file_path, language, chunks);
                }
            }
            "interface_declaration" => {
                let name = field_text(child, "name", source);
                push_chunk(chunks, file_path, child, source, ChunkType::Interface, name, None, language, None);
            }
            _ => {}
        }
    }
}

/// Single-pass top-level scan used for the six grammars without a bespoke
/// recursive walker. Good enough for file-summary and chunking purposes;
/// does not thread nested parent scope the way Rust/Python/JS do.
fn generic_top_level(node: Node, source: &str, file_path: &str, language: Language, chunks: &mut Vec<CodeChunk>) {
    let kinds: &[(&str, ChunkType)] = match language {
        Language::Go => &[
            ("function_declaration", ChunkType::Function),
            ("method_declaration", ChunkType::Method),
            ("type_declaration", ChunkType::Type),
        ],
        Language::Java | Language::CSharp => &[
            ("class_declaration", ChunkType::Class),
            ("interface_declaration", ChunkType::Interface),
            ("enum_declaration", ChunkType::Enum),
            ("method_declaration", ChunkType::Method),
        ],
        Language::C | Language::Cpp => &[
            ("function_definition", ChunkType::Function),
            ("struct_specifier", ChunkType::Struct),
            ("class_specifier", ChunkType::Class),
        ],
        Language::Ruby => &[
            ("method", ChunkType::Method),
            ("class", ChunkType::Class),
            ("module", ChunkType::Module),
        ],
        _ => &[],
    };

    fn walk(node: Node, source: &str, file_path: &str, language: Language, kinds: &[(&str, ChunkType)], chunks: &mut Vec<CodeChunk>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if let Some((_, chunk_type)) = kinds.iter().find(|(kind, _)| *kind == child.kind()) {
                let name = field_text(child, "name", source);
                push_chunk(chunks, file_path, child, source, *chunk_type, name, None, language, None);
            } else {
                walk(child, source, file_path, language, kinds, chunks);
            }
        }
    }

    walk(node, source, file_path, language, kinds, chunks);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_impl_for_trait_uses_type_after_for() {
        let code = r#"
use std::fmt;
struct User;
impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user")
    }
}
"#;
        let chunks = split_ast("a.rs", code, Language::Rust).unwrap();
        let fmt_method = chunks
            .iter()
            .find(|c| c.metadata.symbol_name.as_deref() == Some("fmt"))
            .unwrap();
        assert_eq!(fmt_method.metadata.parent_scope.as_deref(), Some("User"));
    }

    #[test]
    fn python_class_methods_get_parent_scope() {
        let code = "class Foo:\n    def bar(self):\n        return 1\n";
        let chunks = split_ast("a.py", code, Language::Python).unwrap();
        let bar = chunks
            .iter()
            .find(|c| c.metadata.symbol_name.as_deref() == Some("bar"))
            .unwrap();
        assert_eq!(bar.metadata.chunk_type, Some(ChunkType::Method));
        assert_eq!(bar.metadata.parent_scope.as_deref(), Some("Foo"));
    }
}
