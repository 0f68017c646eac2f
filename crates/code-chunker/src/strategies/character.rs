use crate::types::{ChunkMetadata, CodeChunk};

/// Recursive character splitter: the universal fallback strategy. Works at
/// line granularity so chunk boundaries never land mid-line, walking lines
/// greedily until the accumulated window would exceed `target_chars`, then
/// backing up by `overlap_chars` worth of trailing lines for the next
/// window's prefix.
///
/// Guarantees (checked by tests): every line in `[1, line_count]` is covered
/// by at least one chunk, and no chunk span is empty or reversed — if an
/// overlap computation would not advance past the previous start, progress
/// is forced by dropping the overlap for that step.
pub fn split_character(
    file_path: &str,
    text: &str,
    target_chars: usize,
    overlap_chars: usize,
) -> Vec<CodeChunk> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start_idx = 0usize;

    while start_idx < lines.len() {
        let mut end_idx = start_idx;
        let mut len = lines[start_idx].len();
        while end_idx + 1 < lines.len() {
            let next_len = len + 1 + lines[end_idx + 1].len();
            if next_len > target_chars && end_idx > start_idx {
                break;
            }
            end_idx += 1;
            len = next_len;
        }

        let content = lines[start_idx..=end_idx].join("\n");
        chunks.push(CodeChunk::new(
            file_path.to_string(),
            start_idx + 1,
            end_idx + 1,
            content,
            ChunkMetadata::default(),
        ));

        let next_start = next_window_start(&lines, start_idx, end_idx, overlap_chars);
        start_idx = if next_start > start_idx {
            next_start
        } else {
            end_idx + 1
        };
    }

    chunks
}

fn next_window_start(lines: &[&str], start_idx: usize, end_idx: usize, overlap_chars: usize) -> usize {
    if overlap_chars == 0 {
        return end_idx + 1;
    }
    let mut back = 0usize;
    let mut acc = 0usize;
    let mut idx = end_idx;
    loop {
        acc += lines[idx].len() + 1;
        back += 1;
        if acc >= overlap_chars || idx == start_idx {
            break;
        }
        idx -= 1;
    }
    (end_idx + 1).saturating_sub(back)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_every_line_with_no_empty_or_reversed_spans() {
        let text = (1..=500)
            .map(|i| format!("line {i} of the file with some padding text"))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = split_character("big.txt", &text, 400, 80);

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.end_line >= chunk.start_line);
        }

        let max_line = text.lines().count();
        let mut covered = vec![false; max_line + 1];
        for chunk in &chunks {
            for line in chunk.start_line..=chunk.end_line {
                covered[line] = true;
            }
        }
        assert!(covered[1..=max_line].iter().all(|&c| c));
    }

    #[test]
    fn small_file_is_a_single_chunk() {
        let chunks = split_character("small.rs", "fn main() {}\n", 4000, 800);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_line, 1);
    }

    #[test]
    fn empty_text_produces_no_chunks() {
        assert!(split_character("empty.rs", "", 4000, 800).is_empty());
    }
}
