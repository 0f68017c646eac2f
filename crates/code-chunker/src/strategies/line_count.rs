use crate::types::{ChunkMetadata, CodeChunk};

/// Fixed line-count windows with no text overlap. Mainly a last-resort
/// strategy and a simple, predictable fixture for tests exercising the
/// overlap/import-inference post-processing step independent of any
/// regex or AST boundary detection.
pub fn split_line_count(file_path: &str, text: &str, lines_per_chunk: usize) -> Vec<CodeChunk> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }
    let window = lines_per_chunk.max(1);

    lines
        .chunks(window)
        .enumerate()
        .map(|(i, group)| {
            let start = i * window + 1;
            let end = start + group.len() - 1;
            CodeChunk::new(
                file_path.to_string(),
                start,
                end,
                group.join("\n"),
                ChunkMetadata::default(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_all_lines_in_fixed_windows() {
        let text = (1..=45).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let chunks = split_line_count("a.txt", &text, 20);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 20);
        assert_eq!(chunks[2].start_line, 41);
        assert_eq!(chunks[2].end_line, 45);
    }
}
