//! Transport for recordings reachable through a mounted filesystem (NFS, SMB, sshfs).

use std::fs;
use std::path::Path;

use log::debug;

use super::remote_fs::{RemoteConnector, RemoteEntry, RemoteFs};
use crate::error_handling::types::TransportError;

/// Mirrors from paths on the local filesystem. Remote roots are plain local paths.
#[derive(Debug, Default, Clone)]
pub struct DirectoryConnector;

impl DirectoryConnector {
    pub fn new() -> Self {
        Self
    }
}

impl RemoteConnector for DirectoryConnector {
    fn connect(&self) -> Result<Box<dyn RemoteFs>, TransportError> {
        Ok(Box::new(DirectoryFs))
    }

    fn describe(&self) -> String {
        "directory://".to_string()
    }
}

struct DirectoryFs;

impl RemoteFs for DirectoryFs {
    fn list_dir(&mut self, path: &str) -> Result<Vec<RemoteEntry>, TransportError> {
        let list_err = |e: std::io::Error| TransportError::List(path.to_string(), e.to_string());

        let mut entries = Vec::new();
        for entry in fs::read_dir(path).map_err(list_err)? {
            let entry = entry.map_err(list_err)?;
            let metadata = entry.metadata().map_err(list_err)?;
            entries.push(RemoteEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: metadata.is_dir(),
                size: metadata.len(),
            });
        }
        debug!("Listed {} entr(y/ies) in {}", entries.len(), path);
        Ok(entries)
    }

    fn fetch(&mut self, remote: &str, local: &Path) -> Result<u64, TransportError> {
        fs::copy(remote, local).map_err(|e| TransportError::Fetch(remote.to_string(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_and_fetch() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("abc")).unwrap();
        fs::write(dir.path().join("session.mpd"), b"<MPD/>").unwrap();

        let mut remote = DirectoryConnector::new().connect().unwrap();
        let mut entries = remote.list_dir(dir.path().to_str().unwrap()).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "abc");
        assert!(entries[0].is_dir);
        assert_eq!(entries[1].name, "session.mpd");
        assert!(!entries[1].is_dir);
        assert_eq!(entries[1].size, 6);

        let target = dir.path().join("copy.mpd");
        let written = remote
            .fetch(dir.path().join("session.mpd").to_str().unwrap(), &target)
            .unwrap();
        assert_eq!(written, 6);
        assert_eq!(fs::read(target).unwrap(), b"<MPD/>");
    }

    #[test]
    fn test_missing_directory_is_a_list_error() {
        let mut remote = DirectoryConnector::new().connect().unwrap();
        let err = remote.list_dir("/definitely/not/here").unwrap_err();
        assert!(matches!(err, TransportError::List(_, _)));
    }
}
