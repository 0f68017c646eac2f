use crate::hash::project_hash16_legacy;
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub use crate::hash::project_hash32;

/// Directory entries that mark a directory as a project root, checked in
/// order. `.git` also matches a worktree's `.git` *file* (not just a dir).
const ROOT_MARKERS: &[&str] = &[".git", ".hg", ".svn", "Cargo.toml", "package.json", "pyproject.toml", "go.mod"];

/// Walks upward from `start` looking for the nearest ancestor (inclusive)
/// containing one of [`ROOT_MARKERS`]. Returns `None` once it reaches the
/// filesystem root without finding one; callers surface that as
/// `PROJECT_NOT_DETECTED` rather than guessing.
#[must_use]
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let start = std::fs::canonicalize(start).unwrap_or_else(|_| start.to_path_buf());
    let mut current = start.as_path();
    loop {
        if ROOT_MARKERS.iter().any(|marker| current.join(marker).exists()) {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// Default `<state-root>`: `$CONTEXT_FINDER_HOME` if set, otherwise
/// `~/.context-finder`. Falls back to the current directory if neither the
/// override nor a home directory can be resolved, matching the teacher's own
/// best-effort `env::var("HOME")` lookups rather than pulling in a platform
/// directories crate for this alone.
#[must_use]
pub fn default_state_root() -> PathBuf {
    if let Ok(override_dir) = std::env::var("CONTEXT_FINDER_HOME") {
        return PathBuf::from(override_dir);
    }
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".context-finder")
}

/// Paths we've already logged a legacy-directory deprecation warning for, so
/// a long-running process doesn't spam the log once per search.
static WARNED: Lazy<Mutex<std::collections::HashSet<String>>> =
    Lazy::new(|| Mutex::new(std::collections::HashSet::new()));

/// Resolves the on-disk index directory for a project: the current 32-char
/// hash directory if it exists, otherwise the legacy 16-char prefix
/// directory if *that* exists (logging a one-time deprecation warning),
/// otherwise the 32-char path as the location a fresh index should be
/// created at.
#[must_use]
pub fn resolve_index_dir(state_root: &Path, canonical_path: &str) -> PathBuf {
    let current = state_root.join(project_hash32(canonical_path));
    if current.exists() {
        return current;
    }

    let legacy = state_root.join(project_hash16_legacy(canonical_path));
    if legacy.exists() {
        let mut warned = WARNED.lock().expect("warned set poisoned");
        if warned.insert(canonical_path.to_string()) {
            log::warn!(
                "index directory {} uses the legacy 16-char project hash; a future reindex will migrate it to {}",
                legacy.display(),
                current.display()
            );
        }
        return legacy;
    }

    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_the_new_directory_when_both_exist() {
        let dir = tempfile::tempdir().unwrap();
        let path = "/some/project";
        std::fs::create_dir_all(dir.path().join(project_hash32(path))).unwrap();
        std::fs::create_dir_all(dir.path().join(project_hash16_legacy(path))).unwrap();

        let resolved = resolve_index_dir(dir.path(), path);
        assert_eq!(resolved, dir.path().join(project_hash32(path)));
    }

    #[test]
    fn falls_back_to_the_legacy_directory_when_only_it_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = "/some/other/project";
        std::fs::create_dir_all(dir.path().join(project_hash16_legacy(path))).unwrap();

        let resolved = resolve_index_dir(dir.path(), path);
        assert_eq!(resolved, dir.path().join(project_hash16_legacy(path)));
    }

    #[test]
    fn falls_back_to_the_new_path_when_neither_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = "/brand/new/project";
        let resolved = resolve_index_dir(dir.path(), path);
        assert_eq!(resolved, dir.path().join(project_hash32(path)));
    }

    #[test]
    fn state_root_override_takes_precedence() {
        std::env::set_var("CONTEXT_FINDER_HOME", "/tmp/custom-context-finder");
        assert_eq!(default_state_root(), PathBuf::from("/tmp/custom-context-finder"));
        std::env::remove_var("CONTEXT_FINDER_HOME");
    }

    #[test]
    fn finds_root_at_the_starting_directory_itself() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let found = find_project_root(dir.path()).unwrap();
        assert_eq!(found, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn finds_root_from_a_nested_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname=\"x\"").unwrap();
        let nested = dir.path().join("src").join("inner");
        std::fs::create_dir_all(&nested).unwrap();
        let found = find_project_root(&nested).unwrap();
        assert_eq!(found, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn returns_none_when_no_marker_exists_up_to_the_filesystem_root() {
        let dir = tempfile::tempdir().unwrap();
        let lonely = dir.path().join("no-marker-here");
        std::fs::create_dir_all(&lonely).unwrap();
        assert!(find_project_root(&lonely).is_none());
    }
}
