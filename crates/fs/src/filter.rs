use crate::paths::resolve_symlink_within_root;
use globset::{Glob, GlobSet, GlobSetBuilder};
use once_cell::sync::Lazy;
use std::fs;
use std::path::Path;

/// The hard-deny glob list. Cannot be overridden by config; checked before
/// anything else in the filter chain.
static HARD_DENY: Lazy<GlobSet> = Lazy::new(|| build_hard_deny().expect("hard deny globs compile"));

const HARD_DENY_PATTERNS: &[&str] = &[
    // dependency directories
    "**/node_modules/**",
    "**/vendor/**",
    "**/.venv/**",
    "**/venv/**",
    "**/site-packages/**",
    "**/bower_components/**",
    // vcs
    "**/.git/**",
    "**/.hg/**",
    "**/.svn/**",
    // build / framework caches
    "**/target/**",
    "**/dist/**",
    "**/build/**",
    "**/out/**",
    "**/.next/**",
    "**/.nuxt/**",
    "**/.turbo/**",
    "**/.cache/**",
    "**/.parcel-cache/**",
    "**/.gradle/**",
    "**/.mvn/**",
    "**/__pycache__/**",
    "**/.pytest_cache/**",
    "**/.mypy_cache/**",
    "**/.ruff_cache/**",
    "**/.tox/**",
    "**/coverage/**",
    "**/.nyc_output/**",
    "**/.idea/**",
    "**/.vscode/**",
    "**/.vs/**",
    "**/.DS_Store",
    "**/Thumbs.db",
    "**/.terraform/**",
    "**/.serverless/**",
    "**/.context-finder/**",
    "**/.sass-cache/**",
    "**/cmake-build-*/**",
    "**/*.egg-info/**",
    // secrets
    "**/.env",
    "**/.env.*",
    "**/*.pem",
    "**/*.key",
    "**/*.p12",
    "**/*.pfx",
    // locks and logs
    "**/*.lock",
    "**/*.log",
    "**/package-lock.json",
    "**/yarn.lock",
    "**/pnpm-lock.yaml",
    "**/Cargo.lock",
];

fn build_hard_deny() -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in HARD_DENY_PATTERNS {
        builder.add(Glob::new(pattern)?);
    }
    builder.build()
}

const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "svgz", "mp3", "mp4", "mov", "avi", "mkv",
    "wav", "flac", "zip", "gz", "tar", "rar", "7z", "bz2", "xz", "pdf", "doc", "docx", "xls",
    "xlsx", "ppt", "pptx", "so", "dll", "dylib", "exe", "bin", "o", "a", "class", "jar", "wasm",
    "woff", "woff2", "ttf", "otf", "eot", "db", "sqlite", "sqlite3",
];

pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;
pub const MAX_DIRECTORY_DEPTH: usize = 20;
pub const MAX_GLOB_RESULTS: usize = 100_000;

/// Why a candidate path was rejected, so callers can log or report to the
/// user without re-deriving the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    HardDeny,
    UserExclude,
    GitIgnored,
    SymlinkEscapesRoot,
    SymlinkSkipped,
    BinaryContent,
    TooLarge,
    NotIncluded,
}

#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub respect_gitignore: bool,
    pub max_file_size: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            include: vec!["**/*".to_string()],
            exclude: Vec::new(),
            respect_gitignore: true,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Compiled view of a `FilterConfig`: globs parsed once and reused across an
/// entire scan instead of being recompiled per file.
pub struct CompiledFilter {
    include: GlobSet,
    exclude: GlobSet,
    respect_gitignore: bool,
    max_file_size: u64,
}

impl CompiledFilter {
    pub fn compile(config: &FilterConfig) -> Result<Self, globset::Error> {
        let mut include = GlobSetBuilder::new();
        for pattern in &config.include {
            include.add(Glob::new(pattern)?);
        }
        let mut exclude = GlobSetBuilder::new();
        for pattern in &config.exclude {
            exclude.add(Glob::new(pattern)?);
        }
        Ok(Self {
            include: include.build()?,
            exclude: exclude.build()?,
            respect_gitignore: config.respect_gitignore,
            max_file_size: config.max_file_size,
        })
    }

    /// Run the full layered decision for a single candidate path. `gitignore`
    /// is an optional pre-built matcher set (built once per scan from the
    /// project's `.gitignore` files); `root` is the canonical project root.
    pub fn is_indexable(
        &self,
        root: &Path,
        rel: &Path,
        gitignore: Option<&ignore::gitignore::Gitignore>,
    ) -> Result<(), RejectReason> {
        let rel_str = rel.to_string_lossy().replace('\\', "/");

        if HARD_DENY.is_match(&rel_str) {
            return Err(RejectReason::HardDeny);
        }

        if self.exclude.is_match(&rel_str) {
            return Err(RejectReason::UserExclude);
        }

        if self.respect_gitignore {
            if let Some(gi) = gitignore {
                if gi.matched(&rel_str, false).is_ignore() {
                    return Err(RejectReason::GitIgnored);
                }
            }
        }

        let abs = root.join(rel);
        if let Ok(meta) = fs::symlink_metadata(&abs) {
            if meta.file_type().is_symlink() {
                match resolve_symlink_within_root(root, &abs) {
                    Ok(_) => return Err(RejectReason::SymlinkSkipped),
                    Err(_) => return Err(RejectReason::SymlinkEscapesRoot),
                }
            }
        }

        if is_binary_extension(&abs) {
            return Err(RejectReason::BinaryContent);
        }
        if contains_null_byte(&abs) {
            return Err(RejectReason::BinaryContent);
        }

        if let Ok(meta) = fs::metadata(&abs) {
            if meta.len() > self.max_file_size {
                return Err(RejectReason::TooLarge);
            }
        }

        if !self.include.is_match(&rel_str) {
            return Err(RejectReason::NotIncluded);
        }

        Ok(())
    }
}

fn is_binary_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| BINARY_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Sniff the first 8 KiB of a file for a null byte, the cheap heuristic for
/// "this is binary" when the extension alone doesn't tell us.
fn contains_null_byte(path: &Path) -> bool {
    use std::io::Read;
    let Ok(mut f) = fs::File::open(path) else {
        return false;
    };
    let mut buf = [0u8; 8192];
    let Ok(n) = f.read(&mut buf) else {
        return false;
    };
    buf[..n].contains(&0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn setup() -> (TempDir, CompiledFilter) {
        let dir = TempDir::new().unwrap();
        let filter = CompiledFilter::compile(&FilterConfig::default()).unwrap();
        (dir, filter)
    }

    #[test]
    fn hard_deny_rejects_node_modules_regardless_of_include() {
        let (dir, filter) = setup();
        let rel = Path::new("node_modules/pkg/index.js");
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join(rel), "module.exports = {}").unwrap();
        assert_eq!(
            filter.is_indexable(dir.path(), rel, None),
            Err(RejectReason::HardDeny)
        );
    }

    #[test]
    fn binary_sniff_rejects_null_byte_content() {
        let (dir, filter) = setup();
        let rel = Path::new("weird.txt");
        let mut f = fs::File::create(dir.path().join(rel)).unwrap();
        f.write_all(b"hello\0world").unwrap();
        assert_eq!(
            filter.is_indexable(dir.path(), rel, None),
            Err(RejectReason::BinaryContent)
        );
    }

    #[test]
    fn size_cap_rejects_large_files() {
        let dir = TempDir::new().unwrap();
        let config = FilterConfig {
            max_file_size: 10,
            ..FilterConfig::default()
        };
        let filter = CompiledFilter::compile(&config).unwrap();
        let rel = Path::new("big.rs");
        fs::write(dir.path().join(rel), "x".repeat(100)).unwrap();
        assert_eq!(
            filter.is_indexable(dir.path(), rel, None),
            Err(RejectReason::TooLarge)
        );
    }

    #[test]
    fn accepts_plain_source_file() {
        let (dir, filter) = setup();
        let rel = Path::new("src/lib.rs");
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join(rel), "fn main() {}").unwrap();
        assert!(filter.is_indexable(dir.path(), rel, None).is_ok());
    }

    #[test]
    fn user_exclude_overrides_include() {
        let dir = TempDir::new().unwrap();
        let config = FilterConfig {
            exclude: vec!["**/*.generated.rs".to_string()],
            ..FilterConfig::default()
        };
        let filter = CompiledFilter::compile(&config).unwrap();
        let rel = Path::new("src/schema.generated.rs");
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join(rel), "// generated").unwrap();
        assert_eq!(
            filter.is_indexable(dir.path(), rel, None),
            Err(RejectReason::UserExclude)
        );
    }

    #[test]
    fn is_indexable_is_pure_given_same_inputs() {
        let (dir, filter) = setup();
        let rel = Path::new("src/lib.rs");
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join(rel), "fn main() {}").unwrap();
        let first = filter.is_indexable(dir.path(), rel, None);
        let second = filter.is_indexable(dir.path(), rel, None);
        assert_eq!(first, second);
    }
}
