use crate::filter::{CompiledFilter, FilterConfig, RejectReason, MAX_DIRECTORY_DEPTH, MAX_GLOB_RESULTS};
use ignore::gitignore::GitignoreBuilder;
use std::path::{Path, PathBuf};

/// A single accepted file, ready to hand to the chunker.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub size: u64,
    pub modified_ms: u64,
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub accepted: Vec<ScannedFile>,
    pub rejected_counts: std::collections::HashMap<&'static str, usize>,
    pub truncated: bool,
}

/// Walks a project tree applying the layered filter policy, producing the
/// accepted-file list the index manager chunks. `walkdir` drives traversal
/// (depth-bounded); gitignore matching uses `ignore`'s matcher directly
/// rather than re-parsing `.gitignore` files by hand.
pub struct FileScanner {
    root: PathBuf,
    filter: CompiledFilter,
    max_files: usize,
}

impl FileScanner {
    pub fn new(root: impl Into<PathBuf>, config: &FilterConfig, max_files: usize) -> Result<Self, globset::Error> {
        Ok(Self {
            root: root.into(),
            filter: CompiledFilter::compile(config)?,
            max_files,
        })
    }

    pub fn scan(&self) -> ScanReport {
        let mut gitignore_builder = GitignoreBuilder::new(&self.root);
        let gi_path = self.root.join(".gitignore");
        if gi_path.exists() {
            let _ = gitignore_builder.add(gi_path);
        }
        let gitignore = gitignore_builder.build().ok();

        let mut report = ScanReport::default();
        let walker = walkdir::WalkDir::new(&self.root)
            .max_depth(MAX_DIRECTORY_DEPTH)
            .into_iter();

        for entry in walker.filter_map(std::result::Result::ok) {
            if report.accepted.len() >= MAX_GLOB_RESULTS || report.accepted.len() >= self.max_files {
                report.truncated = true;
                break;
            }
            if !entry.file_type().is_file() {
                continue;
            }
            let abs = entry.path();
            let Ok(rel) = abs.strip_prefix(&self.root) else {
                continue;
            };

            match self.filter.is_indexable(&self.root, rel, gitignore.as_ref()) {
                Ok(()) => {
                    let Ok(meta) = entry.metadata() else { continue };
                    let modified_ms = meta
                        .modified()
                        .ok()
                        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                        .map(|d| d.as_millis() as u64)
                        .unwrap_or(0);
                    report.accepted.push(ScannedFile {
                        relative_path: crate::paths::normalize_relative(rel),
                        absolute_path: abs.to_path_buf(),
                        size: meta.len(),
                        modified_ms,
                    });
                }
                Err(reason) => {
                    *report.rejected_counts.entry(reason_tag(&reason)).or_insert(0) += 1;
                }
            }
        }

        report
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn reason_tag(reason: &RejectReason) -> &'static str {
    match reason {
        RejectReason::HardDeny => "hard_deny",
        RejectReason::UserExclude => "user_exclude",
        RejectReason::GitIgnored => "gitignored",
        RejectReason::SymlinkEscapesRoot => "symlink_escapes_root",
        RejectReason::SymlinkSkipped => "symlink_skipped",
        RejectReason::BinaryContent => "binary_content",
        RejectReason::TooLarge => "too_large",
        RejectReason::NotIncluded => "not_included",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn scans_plain_source_tree() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/lib.rs"), "fn main() {}").unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("node_modules/pkg/index.js"), "module.exports={}").unwrap();

        let scanner = FileScanner::new(dir.path(), &FilterConfig::default(), 50_000).unwrap();
        let report = scanner.scan();

        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.accepted[0].relative_path, "src/lib.rs");
        assert!(report.rejected_counts.get("hard_deny").copied().unwrap_or(0) >= 1);
    }

    #[test]
    fn respects_max_files_cap() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("f{i}.rs")), "fn x() {}").unwrap();
        }
        let scanner = FileScanner::new(dir.path(), &FilterConfig::default(), 2).unwrap();
        let report = scanner.scan();
        assert!(report.accepted.len() <= 2);
    }
}
