use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

/// SHA-256 of raw file bytes, lowercase hex. Used as the per-file content hash
/// that fingerprints and the Merkle tree build on.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Position-independent chunk hash: SHA-256 over whitespace-normalized text.
/// Two chunks with identical content hash the same regardless of where they
/// sit in the file, which is what makes move detection possible.
#[must_use]
pub fn chunk_hash(text: &str) -> String {
    content_hash(normalize_whitespace(text).as_bytes())
}

/// Collapse all runs of ASCII/Unicode whitespace to a single space and trim
/// the ends, so that reindentation or trailing-newline churn never changes a
/// chunk's hash.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

/// First 32 hex characters of SHA-256 over a canonicalized absolute path.
/// This is the index-directory name for a project.
#[must_use]
pub fn project_hash32(canonical_path: &str) -> String {
    let full = content_hash(canonical_path.as_bytes());
    full[..32].to_string()
}

/// Legacy 16-char prefix of the same hash, kept only so old index directories
/// are still discoverable.
#[must_use]
pub fn project_hash16_legacy(canonical_path: &str) -> String {
    let full = content_hash(canonical_path.as_bytes());
    full[..16].to_string()
}

/// NFC-normalize a path string and strip zero-width / bidi-override
/// codepoints so that visually identical paths compare and hash identically
/// and cannot smuggle filter-bypassing lookalikes.
#[must_use]
pub fn sanitize_unicode_path(input: &str) -> String {
    const STRIP: &[char] = &[
        '\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}', '\u{202A}', '\u{202B}', '\u{202C}',
        '\u{202D}', '\u{202E}', '\u{2066}', '\u{2067}', '\u{2068}', '\u{2069}',
    ];
    input
        .nfc()
        .filter(|c| !STRIP.contains(c))
        .collect::<String>()
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        use std::fmt::Write;
        let mut out = String::with_capacity(bytes.as_ref().len() * 2);
        for b in bytes.as_ref() {
            let _ = write!(out, "{b:02x}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_stable() {
        assert_eq!(content_hash(b"hello"), content_hash(b"hello"));
        assert_ne!(content_hash(b"hello"), content_hash(b"hellp"));
    }

    #[test]
    fn chunk_hash_ignores_whitespace_reshaping() {
        let a = "fn  foo()  {\n    bar();\n}";
        let b = "fn foo() {\nbar();\n}";
        assert_eq!(chunk_hash(a), chunk_hash(b));
    }

    #[test]
    fn chunk_hash_differs_on_real_edit() {
        assert_ne!(chunk_hash("fn foo() {}"), chunk_hash("fn bar() {}"));
    }

    #[test]
    fn project_hash32_is_32_hex_chars() {
        let h = project_hash32("/home/user/project");
        assert_eq!(h.len(), 32);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn legacy_hash_is_prefix_of_full_hash() {
        let full = content_hash("/home/user/project".as_bytes());
        assert_eq!(project_hash16_legacy("/home/user/project"), full[..16]);
    }

    #[test]
    fn sanitize_strips_zero_width_and_bidi() {
        let evil = "src/\u{202E}gnp.exe\u{2066}.rs";
        let clean = sanitize_unicode_path(evil);
        assert!(!clean.contains('\u{202E}'));
        assert!(!clean.contains('\u{2066}'));
    }
}
