use crate::error::{FsError, Result};
use std::path::{Component, Path, PathBuf};

/// Join `root` with `rel`, rejecting any `..` component that would escape
/// `root`. Pure path arithmetic; does not touch the filesystem, so it is safe
/// to call before the target exists.
pub fn safe_join(root: &Path, rel: &Path) -> Result<PathBuf> {
    let mut out = root.to_path_buf();
    let mut depth: i64 = 0;

    for component in rel.components() {
        match component {
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return Err(FsError::PathEscape(rel.display().to_string()));
                }
                out.pop();
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(FsError::PathEscape(rel.display().to_string()));
            }
        }
    }

    Ok(out)
}

/// Resolve a symlink's target and confirm it does not escape `root`. Returns
/// the canonical target path on success.
pub fn resolve_symlink_within_root(root: &Path, link: &Path) -> Result<PathBuf> {
    let target = std::fs::read_link(link)?;
    let resolved = if target.is_absolute() {
        target
    } else {
        link.parent().unwrap_or(root).join(target)
    };

    let canonical_root = root.canonicalize()?;
    let canonical_target = resolved
        .canonicalize()
        .map_err(|_| FsError::SymlinkEscape(link.display().to_string()))?;

    if !canonical_target.starts_with(&canonical_root) {
        return Err(FsError::SymlinkEscape(link.display().to_string()));
    }

    Ok(canonical_target)
}

/// Normalize a relative path for storage: forward slashes only, no leading
/// `./`, NFC-normalized and stripped of bidi/zero-width codepoints.
#[must_use]
pub fn normalize_relative(rel: &Path) -> String {
    let raw = rel.to_string_lossy().replace('\\', "/");
    let raw = raw.strip_prefix("./").unwrap_or(&raw);
    crate::hash::sanitize_unicode_path(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn safe_join_rejects_escape() {
        let root = Path::new("/project");
        assert!(safe_join(root, Path::new("../../etc/passwd")).is_err());
    }

    #[test]
    fn safe_join_allows_internal_dotdot_that_nets_positive() {
        let root = Path::new("/project");
        let joined = safe_join(root, Path::new("src/../lib/mod.rs")).unwrap();
        assert_eq!(joined, Path::new("/project/lib/mod.rs"));
    }

    #[test]
    fn safe_join_rejects_absolute_rel() {
        let root = Path::new("/project");
        assert!(safe_join(root, Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn normalize_relative_uses_forward_slashes() {
        assert_eq!(normalize_relative(Path::new("src\\lib.rs")), "src/lib.rs");
    }
}
