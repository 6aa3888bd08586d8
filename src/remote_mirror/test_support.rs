//! Fixtures shared by mirror and catalog tests.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::directory::DirectoryConnector;
use super::remote_fs::{RemoteConnector, RemoteEntry, RemoteFs};
use crate::error_handling::types::TransportError;

/// Builds `clips/abc` and `video/xyz` recordings under `dir` and returns the two roots.
pub(crate) fn write_remote_tree(dir: &Path) -> Vec<String> {
    let files = [
        ("clips/abc/session.mpd", "<MPD><Period id=\"0\" start=\"PT5S\"></Period></MPD>"),
        ("clips/abc/chunk-stream0-00001.m4s", "segment-a"),
        ("video/xyz/session.mpd", "<MPD><Period id=\"0\" start=\"PT9S\"></Period></MPD>"),
        ("video/xyz/chunk-stream0-00001.m4s", "segment-b"),
    ];
    for (path, content) in files {
        let full = dir.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
    vec![
        dir.join("clips").to_string_lossy().into_owned(),
        dir.join("video").to_string_lossy().into_owned(),
    ]
}

/// Directory transport that counts fetches and can be told to fail some of them.
pub(crate) struct CountingConnector {
    inner: DirectoryConnector,
    fetches: Arc<AtomicUsize>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl CountingConnector {
    pub(crate) fn new() -> Self {
        Self {
            inner: DirectoryConnector::new(),
            fetches: Arc::new(AtomicUsize::new(0)),
            failing: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Every fetch of a remote path ending in `suffix` fails after writing a partial file.
    pub(crate) fn fail_on(&self, suffix: &str) {
        self.failing.lock().unwrap().push(suffix.to_string());
    }
}

impl RemoteConnector for CountingConnector {
    fn connect(&self) -> Result<Box<dyn RemoteFs>, TransportError> {
        Ok(Box::new(CountingFs {
            inner: self.inner.connect()?,
            fetches: Arc::clone(&self.fetches),
            failing: Arc::clone(&self.failing),
        }))
    }

    fn describe(&self) -> String {
        "counting://".to_string()
    }
}

struct CountingFs {
    inner: Box<dyn RemoteFs>,
    fetches: Arc<AtomicUsize>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl RemoteFs for CountingFs {
    fn list_dir(&mut self, path: &str) -> Result<Vec<RemoteEntry>, TransportError> {
        self.inner.list_dir(path)
    }

    fn fetch(&mut self, remote: &str, local: &Path) -> Result<u64, TransportError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let fails = self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|suffix| remote.ends_with(suffix.as_str()));
        if fails {
            fs::write(local, b"partial").unwrap();
            return Err(TransportError::Fetch(remote.to_string(), "connection reset".into()));
        }
        self.inner.fetch(remote, local)
    }
}
