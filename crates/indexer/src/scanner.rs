use context_fs::filter::FilterConfig;
use context_fs::scanner::FileScanner as CoreScanner;
use std::path::{Path, PathBuf};

const DEFAULT_MAX_FILES: usize = 200_000;

/// Indexer-facing wrapper over `context_fs`'s layered-filter scanner,
/// returning the plain absolute paths the rest of this crate works with.
pub struct FileScanner {
    root: PathBuf,
    config: FilterConfig,
}

impl FileScanner {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config: FilterConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(root: impl Into<PathBuf>, config: FilterConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    #[must_use]
    pub fn scan(&self) -> Vec<PathBuf> {
        let Ok(core) = CoreScanner::new(&self.root, &self.config, DEFAULT_MAX_FILES) else {
            log::warn!("invalid filter config for {}", self.root.display());
            return Vec::new();
        };
        let report = core.scan();
        if report.truncated {
            log::warn!(
                "file scan truncated at {DEFAULT_MAX_FILES} files under {}",
                self.root.display()
            );
        }
        report
            .accepted
            .into_iter()
            .map(|f| f.absolute_path)
            .collect()
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn scans_source_files_under_root() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
        let scanner = FileScanner::new(dir.path());
        let files = scanner.scan();
        assert_eq!(files.len(), 1);
    }
}
