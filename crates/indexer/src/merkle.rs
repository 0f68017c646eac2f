use context_code_chunker::CodeChunk;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
struct FileEntry {
    /// Position-ordered chunk hashes for this file.
    chunk_hashes: Vec<String>,
    file_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct MerkleDiff {
    pub added_files: Vec<String>,
    pub modified_files: Vec<String>,
    pub removed_files: Vec<String>,
    /// Per modified file: chunk hashes present in `self` but not in the other tree.
    pub added_chunk_hashes: HashMap<String, HashSet<String>>,
    /// Per modified file: chunk hashes present in the other tree but not in `self`.
    pub removed_chunk_hashes: HashMap<String, HashSet<String>>,
}

/// Per-file ordered chunk-hash lists, rolled up into file hashes and a
/// project root hash. Enables cheap drift detection and, within a changed
/// file, move detection (identical chunk hash reappearing at a new index).
#[derive(Debug, Clone, Default)]
pub struct MerkleTree {
    files: HashMap<String, FileEntry>,
}

impl MerkleTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_file_chunks(&mut self, relative_path: String, chunks: &[CodeChunk]) {
        let chunk_hashes: Vec<String> = chunks.iter().map(|c| c.chunk_hash.clone()).collect();
        let file_hash = context_fs::hash::content_hash(chunk_hashes.join("").as_bytes());
        self.files.insert(
            relative_path,
            FileEntry {
                chunk_hashes,
                file_hash,
            },
        );
    }

    pub fn remove_file(&mut self, relative_path: &str) {
        self.files.remove(relative_path);
    }

    #[must_use]
    pub fn chunk_hashes(&self, relative_path: &str) -> Option<&[String]> {
        self.files.get(relative_path).map(|e| e.chunk_hashes.as_slice())
    }

    #[must_use]
    pub fn root_hash(&self) -> String {
        let mut pairs: Vec<(&String, &String)> =
            self.files.iter().map(|(path, entry)| (path, &entry.file_hash)).collect();
        pairs.sort_by_key(|(path, _)| path.as_str());
        let joined: String = pairs.iter().map(|(p, h)| format!("{p}:{h}")).collect();
        context_fs::hash::content_hash(joined.as_bytes())
    }

    #[must_use]
    pub fn diff(&self, other: &MerkleTree) -> MerkleDiff {
        let mut out = MerkleDiff::default();
        let self_paths: HashSet<&String> = self.files.keys().collect();
        let other_paths: HashSet<&String> = other.files.keys().collect();

        for path in self_paths.difference(&other_paths) {
            out.added_files.push((*path).clone());
        }
        for path in other_paths.difference(&self_paths) {
            out.removed_files.push((*path).clone());
        }
        for path in self_paths.intersection(&other_paths) {
            let mine = &self.files[*path];
            let theirs = &other.files[*path];
            if mine.file_hash == theirs.file_hash {
                continue;
            }
            out.modified_files.push((*path).clone());
            let mine_set: HashSet<String> = mine.chunk_hashes.iter().cloned().collect();
            let their_set: HashSet<String> = theirs.chunk_hashes.iter().cloned().collect();
            out.added_chunk_hashes
                .insert((*path).clone(), mine_set.difference(&their_set).cloned().collect());
            out.removed_chunk_hashes
                .insert((*path).clone(), their_set.difference(&mine_set).cloned().collect());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_code_chunker::ChunkMetadata;

    fn chunk(content: &str) -> CodeChunk {
        CodeChunk::new("a.rs".to_string(), 1, 1, content.to_string(), ChunkMetadata::default())
    }

    #[test]
    fn diff_detects_added_modified_removed_files() {
        let mut before = MerkleTree::new();
        before.set_file_chunks("a.rs".to_string(), &[chunk("one")]);
        before.set_file_chunks("b.rs".to_string(), &[chunk("two")]);

        let mut after = MerkleTree::new();
        after.set_file_chunks("a.rs".to_string(), &[chunk("one-changed")]);
        after.set_file_chunks("c.rs".to_string(), &[chunk("three")]);

        let diff = after.diff(&before);
        assert_eq!(diff.added_files, vec!["c.rs".to_string()]);
        assert_eq!(diff.modified_files, vec!["a.rs".to_string()]);
        assert_eq!(diff.removed_files, vec!["b.rs".to_string()]);
    }

    #[test]
    fn unchanged_file_has_stable_root_hash() {
        let mut tree = MerkleTree::new();
        tree.set_file_chunks("a.rs".to_string(), &[chunk("one")]);
        let h1 = tree.root_hash();
        let h2 = tree.root_hash();
        assert_eq!(h1, h2);
    }
}
