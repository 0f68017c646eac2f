use crate::config::{DOCS_OVERLAP_CHARS, DOCS_TARGET_CHARS};
use crate::strategies::character::split_character;
use crate::types::{ChunkMetadata, ChunkType, CodeChunk};

struct Section {
    breadcrumb: Vec<String>,
    level: u8,
    start_line: usize,
    end_line: usize,
    body: String,
}

/// Header-aware Markdown chunker. Strips YAML frontmatter, treats fenced
/// code blocks as atomic (never splits inside a ``` fence even while
/// scanning for headers), and emits one chunk per section with a breadcrumb
/// like `[Guide > Installation]`. Oversized sections are character-split
/// further and tagged with `part`/`total_parts`.
pub fn split_markdown(file_path: &str, text: &str) -> Vec<CodeChunk> {
    let (body, frontmatter_lines) = strip_frontmatter(text);
    let lines: Vec<&str> = body.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let sections = build_sections(&lines, frontmatter_lines);
    let mut chunks = Vec::new();

    for section in sections {
        let breadcrumb = if section.breadcrumb.is_empty() {
            String::new()
        } else {
            format!("[{}]", section.breadcrumb.join(" > "))
        };

        if section.body.len() <= DOCS_TARGET_CHARS * 2 {
            chunks.push(make_chunk(
                file_path,
                &section,
                &breadcrumb,
                section.body.clone(),
                None,
                None,
            ));
        } else {
            let sub = split_character(file_path, &section.body, DOCS_TARGET_CHARS, DOCS_OVERLAP_CHARS);
            let total = sub.len() as u32;
            for (i, s) in sub.into_iter().enumerate() {
                chunks.push(make_chunk(
                    file_path,
                    &Section {
                        breadcrumb: section.breadcrumb.clone(),
                        level: section.level,
                        start_line: section.start_line + s.start_line - 1,
                        end_line: section.start_line + s.end_line - 1,
                        body: s.content.clone(),
                    },
                    &breadcrumb,
                    s.content,
                    Some(i as u32 + 1),
                    Some(total),
                ));
            }
        }
    }

    chunks
}

fn make_chunk(
    file_path: &str,
    section: &Section,
    breadcrumb: &str,
    content: String,
    part: Option<u32>,
    total_parts: Option<u32>,
) -> CodeChunk {
    let mut metadata = ChunkMetadata::default()
        .chunk_type(ChunkType::Section)
        .language("markdown");
    if !breadcrumb.is_empty() {
        metadata = metadata.header_path(breadcrumb);
    }
    metadata = metadata.header_level(section.level);
    if let (Some(p), Some(t)) = (part, total_parts) {
        metadata = metadata.part(p, t);
    }
    CodeChunk::new(
        file_path.to_string(),
        section.start_line,
        section.end_line,
        content,
        metadata,
    )
}

fn strip_frontmatter(text: &str) -> (&str, usize) {
    if let Some(rest) = text.strip_prefix("---\n") {
        if let Some(end) = rest.find("\n---\n") {
            let consumed = "---\n".len() + end + "\n---\n".len();
            let fm_lines = text[..consumed].lines().count();
            return (&text[consumed..], fm_lines);
        }
    }
    (text, 0)
}

fn build_sections(lines: &[&str], line_offset: usize) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut stack: Vec<(u8, String)> = Vec::new();
    let mut current_start = 0usize;
    let mut current_breadcrumb: Vec<String> = Vec::new();
    let mut current_level: u8 = 0;
    let mut in_fence = false;

    let mut i = 0usize;
    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim_start();

        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            i += 1;
            continue;
        }

        if !in_fence {
            if let Some((level, title)) = atx_header(line) {
                flush_section(
                    &mut sections,
                    &current_breadcrumb,
                    current_level,
                    current_start,
                    i,
                    lines,
                    line_offset,
                );
                while stack.last().is_some_and(|(lvl, _)| *lvl >= level) {
                    stack.pop();
                }
                stack.push((level, title.clone()));
                current_breadcrumb = stack.iter().map(|(_, t)| t.clone()).collect();
                current_level = level;
                current_start = i;
                i += 1;
                continue;
            }

            if i + 1 < lines.len() {
                if let Some(level) = setext_level(lines[i + 1]) {
                    if !trimmed.is_empty() {
                        let title = trimmed.to_string();
                        flush_section(
                            &mut sections,
                            &current_breadcrumb,
                            current_level,
                            current_start,
                            i,
                            lines,
                            line_offset,
                        );
                        while stack.last().is_some_and(|(lvl, _)| *lvl >= level) {
                            stack.pop();
                        }
                        stack.push((level, title.clone()));
                        current_breadcrumb = stack.iter().map(|(_, t)| t.clone()).collect();
                        current_level = level;
                        current_start = i;
                        i += 2;
                        continue;
                    }
                }
            }
        }

        i += 1;
    }

    flush_section(
        &mut sections,
        &current_breadcrumb,
        current_level,
        current_start,
        lines.len(),
        lines,
        line_offset,
    );

    sections
}

#[allow(clippy::too_many_arguments)]
fn flush_section(
    sections: &mut Vec<Section>,
    breadcrumb: &[String],
    level: u8,
    start: usize,
    end: usize,
    lines: &[&str],
    line_offset: usize,
) {
    if start >= end {
        return;
    }
    let body = lines[start..end].join("\n");
    if body.trim().is_empty() {
        return;
    }
    sections.push(Section {
        breadcrumb: breadcrumb.to_vec(),
        level,
        start_line: line_offset + start + 1,
        end_line: line_offset + end,
        body,
    });
}

fn atx_header(line: &str) -> Option<(u8, String)> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with('#') {
        return None;
    }
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = trimmed[level..].trim();
    if rest.is_empty() && trimmed.len() == level {
        return None;
    }
    Some((level as u8, rest.trim_end_matches('#').trim().to_string()))
}

fn setext_level(underline: &str) -> Option<u8> {
    let trimmed = underline.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().all(|c| c == '=') {
        Some(1)
    } else if trimmed.chars().all(|c| c == '-') {
        Some(2)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_breadcrumb_for_nested_headers() {
        let md = "# Guide\n\nintro text\n\n## Installation\n\nrun cargo build\n";
        let chunks = split_markdown("guide.md", md);
        let install = chunks
            .iter()
            .find(|c| c.content.contains("cargo build"))
            .unwrap();
        assert_eq!(
            install.metadata.header_path.as_deref(),
            Some("[Guide > Installation]")
        );
    }

    #[test]
    fn strips_yaml_frontmatter() {
        let md = "---\ntitle: Hi\n---\n# Hello\n\nbody\n";
        let chunks = split_markdown("a.md", md);
        assert!(chunks.iter().all(|c| !c.content.contains("title: Hi")));
    }

    #[test]
    fn preserves_fenced_code_blocks_as_atomic() {
        let md = "# Code\n\n```rust\nfn not_a_header() {\n    // ## looks like a header but isn't\n}\n```\n";
        let chunks = split_markdown("a.md", md);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.contains("fn not_a_header"));
    }
}
