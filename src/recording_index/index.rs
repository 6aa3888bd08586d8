use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::recording::Recording;

/// Discovers recordings below a root directory.
///
/// A directory is a recording iff it directly contains the manifest file. The index keeps
/// no state between walks: the filesystem decides which recordings exist, every call to
/// [`RecordingIndex::discover`] walks it again.
#[derive(Debug, Clone)]
pub struct RecordingIndex {
    root: PathBuf,
    manifest_name: String,
    /// Top-level directories to descend into, `None` for all of them
    subtrees: Option<HashSet<String>>,
}

impl RecordingIndex {
    pub fn new(root: PathBuf, manifest_name: String, subtrees: Option<Vec<String>>) -> Self {
        Self {
            root,
            manifest_name,
            subtrees: subtrees.map(|s| s.into_iter().collect()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily walks the root depth-first, children in name order.
    pub fn discover(&self) -> Discovery<'_> {
        let stack = if self.root.is_dir() {
            vec![PathBuf::new()]
        } else {
            debug!("Recordings root {} does not exist yet", self.root.display());
            Vec::new()
        };
        Discovery { index: self, stack }
    }

    fn accepts_top_level(&self, name: &str) -> bool {
        match &self.subtrees {
            Some(subtrees) => subtrees.contains(name),
            None => true,
        }
    }
}

/// Iterator returned by [`RecordingIndex::discover`].
pub struct Discovery<'a> {
    index: &'a RecordingIndex,
    /// Directories still to visit, relative to the root
    stack: Vec<PathBuf>,
}

impl Discovery<'_> {
    fn visit(&mut self, relative: &Path) -> Option<Recording> {
        let dir = self.index.root.join(relative);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Skipping unreadable directory {}: {}", dir.display(), e);
                return None;
            }
        };

        let mut has_manifest = false;
        let mut children = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                let name = name.to_string_lossy();
                if relative.as_os_str().is_empty() && !self.index.accepts_top_level(&name) {
                    debug!("Skipping {} outside the recognized subtrees", name);
                    continue;
                }
                children.push(relative.join(&*name));
            } else if name == self.index.manifest_name.as_str() {
                has_manifest = true;
            }
        }

        // Reverse order so the smallest name is popped first.
        children.sort_unstable_by(|a, b| b.cmp(a));
        self.stack.extend(children);

        if !has_manifest || relative.as_os_str().is_empty() {
            return None;
        }
        Some(Recording::new(&self.index.root, relative.to_path_buf(), &self.index.manifest_name))
    }
}

impl Iterator for Discovery<'_> {
    type Item = Recording;

    fn next(&mut self) -> Option<Recording> {
        while let Some(relative) = self.stack.pop() {
            if let Some(recording) = self.visit(&relative) {
                return Some(recording);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, path: &str) {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, b"").unwrap();
    }

    fn identities(index: &RecordingIndex) -> Vec<String> {
        index.discover().map(|r| r.identity).collect()
    }

    #[test]
    fn test_discovers_manifest_directories() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "clips/abc/session.mpd");
        touch(dir.path(), "clips/abc/chunk-stream0-00001.m4s");
        touch(dir.path(), "video/xyz/session.mpd");
        touch(dir.path(), "video/empty/readme.txt");

        let index = RecordingIndex::new(dir.path().to_path_buf(), "session.mpd".into(), None);
        let found: Vec<Recording> = index.discover().collect();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].identity, "clips_abc");
        assert_eq!(found[0].relative_path, PathBuf::from("clips/abc"));
        assert_eq!(found[0].manifest_path, dir.path().join("clips/abc/session.mpd"));
        assert_eq!(found[1].identity, "video_xyz");
    }

    #[test]
    fn test_nested_recordings_are_found() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "video/bg_1/session.mpd");
        touch(dir.path(), "video/bg_1/part2/session.mpd");

        let index = RecordingIndex::new(dir.path().to_path_buf(), "session.mpd".into(), None);
        assert_eq!(identities(&index), vec!["video_bg_1", "video_bg_1_part2"]);
    }

    #[test]
    fn test_unrecognized_subtrees_are_skipped() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "clips/abc/session.mpd");
        touch(dir.path(), "screenshots/shot/session.mpd");

        let index = RecordingIndex::new(
            dir.path().to_path_buf(),
            "session.mpd".into(),
            Some(vec!["clips".into(), "video".into()]),
        );
        assert_eq!(identities(&index), vec!["clips_abc"]);
    }

    #[test]
    fn test_manifest_at_root_is_not_a_recording() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "session.mpd");

        let index = RecordingIndex::new(dir.path().to_path_buf(), "session.mpd".into(), None);
        assert!(identities(&index).is_empty());
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let index = RecordingIndex::new(dir.path().join("absent"), "session.mpd".into(), None);
        assert_eq!(index.discover().count(), 0);
    }

    #[test]
    fn test_lookalike_directories_get_their_own_identity() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "clips/a_b/session.mpd");
        let index = RecordingIndex::new(dir.path().to_path_buf(), "session.mpd".into(), None);
        let before: Vec<Recording> = index.discover().collect();
        assert_eq!(before.len(), 1);

        touch(dir.path(), "clips/a b/session.mpd");
        touch(dir.path(), "clips/a/b/session.mpd");
        let after: Vec<Recording> = index.discover().collect();

        assert_eq!(after.len(), 3);
        let owner = after.iter().find(|r| r.identity == before[0].identity).unwrap();
        assert_eq!(owner.relative_path, PathBuf::from("clips/a_b"));
        let unique: HashSet<&str> = after.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_identities_stable_as_tree_grows() {
        use rand::{Rng, SeedableRng};
        const ALPHABET: &[u8] = b"ab_ \t-";
        let dir = TempDir::new().unwrap();
        let index = RecordingIndex::new(dir.path().to_path_buf(), "session.mpd".into(), None);
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut owners: std::collections::HashMap<String, PathBuf> = std::collections::HashMap::new();

        for _walk in 0..5 {
            for _ in 0..20 {
                let mut relative = PathBuf::from("clips");
                for _ in 0..rng.gen_range(1..=2) {
                    let len = rng.gen_range(1..=3);
                    let part: String = (0..len)
                        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
                        .collect();
                    relative.push(part);
                }
                touch(dir.path(), &relative.join("session.mpd").to_string_lossy());
            }

            let found: Vec<Recording> = index.discover().collect();
            let unique: HashSet<&str> = found.iter().map(|r| r.identity.as_str()).collect();
            assert_eq!(unique.len(), found.len(), "two recordings share an artifact name");
            for recording in found {
                let owner = owners
                    .entry(recording.identity.clone())
                    .or_insert_with(|| recording.relative_path.clone());
                assert_eq!(*owner, recording.relative_path, "{} changed owner", recording.identity);
            }
        }
    }

    #[test]
    fn test_walk_is_restartable_and_sees_new_recordings() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "clips/abc/session.mpd");
        let index = RecordingIndex::new(dir.path().to_path_buf(), "session.mpd".into(), None);
        assert_eq!(identities(&index), vec!["clips_abc"]);

        touch(dir.path(), "clips/def/session.mpd");
        assert_eq!(identities(&index), vec!["clips_abc", "clips_def"]);
    }
}
