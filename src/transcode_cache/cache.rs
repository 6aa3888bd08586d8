use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info, trace};
use tokio::sync::Semaphore;

use super::keyed_lock::KeyedLocks;
use super::manifest::normalize_period_start;
use super::remux::{container_format, Remuxer};
use crate::error_handling::types::TranscodeError;
use crate::recording_index::Recording;

/// One artifact slot, named after the recording identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub identity: String,
    /// `<identity>.<extension>`, also the name the artifact is served under
    pub file_name: String,
    pub path: PathBuf,
}

impl CacheEntry {
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Memoizes remux results in the artifact directory.
///
/// Artifacts are only ever added; they disappear through [`TranscodeCache::invalidate`]
/// alone. Concurrent requests for one identity share a single remux, requests for different
/// identities run in parallel up to the worker limit.
pub struct TranscodeCache {
    artifact_dir: PathBuf,
    extension: String,
    remuxer: Arc<dyn Remuxer>,
    locks: KeyedLocks,
    workers: Semaphore,
}

impl TranscodeCache {
    pub fn new(artifact_dir: PathBuf, extension: &str, remuxer: Arc<dyn Remuxer>, max_concurrent: usize) -> Self {
        Self {
            artifact_dir,
            extension: extension.trim_start_matches('.').to_string(),
            remuxer,
            locks: KeyedLocks::new(),
            workers: Semaphore::new(max_concurrent.max(1)),
        }
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn entry_for(&self, identity: &str) -> CacheEntry {
        let file_name = format!("{}.{}", identity, self.extension);
        CacheEntry {
            identity: identity.to_string(),
            path: self.artifact_dir.join(&file_name),
            file_name,
        }
    }

    /// Returns the artifact for `recording`, producing it first when missing.
    pub async fn materialize(&self, recording: &Recording) -> Result<CacheEntry, TranscodeError> {
        let entry = self.entry_for(&recording.identity);
        if entry.exists() {
            trace!("Cache hit for {}", entry.identity);
            return Ok(entry);
        }

        let _key = self.locks.lock(&entry.identity).await;
        if entry.exists() {
            debug!("{} was produced while waiting for its lock", entry.file_name);
            return Ok(entry);
        }

        let _worker = self
            .workers
            .acquire()
            .await
            .map_err(|_| TranscodeError::WorkerFailed)?;
        self.transcode(recording, &entry).await?;
        Ok(entry)
    }

    async fn transcode(&self, recording: &Recording, entry: &CacheEntry) -> Result<(), TranscodeError> {
        tokio::fs::create_dir_all(&self.artifact_dir)
            .await
            .map_err(|e| TranscodeError::Io(format!("{}: {}", self.artifact_dir.display(), e)))?;
        normalize_period_start(&recording.manifest_path).await?;

        let partial = self.artifact_dir.join(format!(".{}.part", entry.file_name));
        info!(
            "Transcoding {} into {}",
            recording.relative_path.display(),
            entry.file_name
        );
        let started = Instant::now();

        let result = self
            .remuxer
            .remux(&recording.manifest_path, &partial, container_format(&self.extension))
            .await;
        let result = match result {
            Ok(()) if partial.is_file() => tokio::fs::rename(&partial, &entry.path)
                .await
                .map_err(|e| TranscodeError::Io(format!("{}: {}", entry.path.display(), e))),
            Ok(()) => Err(TranscodeError::MissingOutput(partial.clone())),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!("Transcoded {} in {:.1?}", entry.file_name, started.elapsed());
                Ok(())
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                error!("Transcoding {} failed: {}", entry.file_name, e);
                Err(e)
            }
        }
    }

    /// Drops every artifact by recreating the artifact directory.
    pub async fn invalidate(&self) -> io::Result<()> {
        match tokio::fs::remove_dir_all(&self.artifact_dir).await {
            Ok(()) => info!("Cleared artifact cache {}", self.artifact_dir.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        tokio::fs::create_dir_all(&self.artifact_dir).await
    }

    #[cfg(test)]
    pub(crate) fn pending_keys(&self) -> usize {
        self.locks.len()
    }
}
