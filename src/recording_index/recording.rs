use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};

/// Character every path separator and whitespace character is replaced with.
pub const IDENTITY_SEPARATOR: char = '_';

/// Marks the digest appended to identities whose path needed escaping.
const DIGEST_MARKER: &str = "__";
const DIGEST_BYTES: usize = 6;

/// One recorded session: a directory holding a streaming manifest plus its segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    /// Path of the recording directory relative to the index root
    pub relative_path: PathBuf,
    /// Stable key shared by discovery and the artifact cache
    pub identity: String,
    pub manifest_path: PathBuf,
}

impl Recording {
    pub fn new(root: &Path, relative_path: PathBuf, manifest_name: &str) -> Self {
        let manifest_path = root.join(&relative_path).join(manifest_name);
        Self {
            identity: identity_for(&relative_path),
            relative_path,
            manifest_path,
        }
    }
}

/// Derives a recording identity from its path relative to the index root.
///
/// Path components are joined with `_`, so `clips/abc` gives `clips_abc`. `.`, `..` and root
/// components are dropped. A component holding `_`, whitespace or `\` would make the joined
/// form ambiguous, so those characters become `_` and the identity gets `__` plus a short
/// SHA-256 digest of the path itself: `video/my session` gives `video_my_session__<hex>`.
/// Plain identities never contain `__`, and the digest tells escaped paths apart, so the
/// result depends on nothing but the path.
pub fn identity_for(relative_path: &Path) -> String {
    let parts: Vec<String> = relative_path
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let escaped = parts.iter().any(|part| part.chars().any(is_reserved));
    let sanitized: Vec<String> = parts
        .iter()
        .map(|part| {
            part.chars()
                .map(|c| if is_reserved(c) { IDENTITY_SEPARATOR } else { c })
                .collect()
        })
        .collect();
    let mut identity = sanitized.join(&IDENTITY_SEPARATOR.to_string());

    if escaped {
        let digest = Sha256::digest(parts.join("/").as_bytes());
        identity.push_str(DIGEST_MARKER);
        identity.push_str(&hex::encode(&digest[..DIGEST_BYTES]));
    }
    identity
}

fn is_reserved(c: char) -> bool {
    c == IDENTITY_SEPARATOR || c == '\\' || c.is_whitespace()
}
