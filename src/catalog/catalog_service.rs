use std::io;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, info, warn};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;

use super::artifact_stream::{resolve_artifact, ArtifactStream};
use crate::error_handling::types::CatalogError;
use crate::recording_index::{Recording, RecordingIndex};
use crate::sync_coordinator::SyncCoordinator;
use crate::transcode_cache::TranscodeCache;

/// URL prefix under which artifacts are served.
pub const ACCESS_PREFIX: &str = "/video-cache";

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// What a catalog read does when it finds a sync running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Report busy right away.
    FailFast,
    /// Wait up to the given time for the sync to finish, then report busy.
    Wait(Duration),
}

impl ReadPolicy {
    pub fn from_wait(wait: Duration) -> Self {
        if wait.is_zero() {
            ReadPolicy::FailFast
        } else {
            ReadPolicy::Wait(wait)
        }
    }

    fn wait(&self) -> Duration {
        match self {
            ReadPolicy::FailFast => Duration::ZERO,
            ReadPolicy::Wait(wait) => *wait,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoEntry {
    pub name: String,
    /// Access path resolvable by the streaming endpoint
    pub path: String,
}

pub struct CatalogService {
    index: RecordingIndex,
    cache: Arc<TranscodeCache>,
    coordinator: Arc<SyncCoordinator>,
    policy: ReadPolicy,
}

impl CatalogService {
    pub fn new(
        index: RecordingIndex,
        cache: Arc<TranscodeCache>,
        coordinator: Arc<SyncCoordinator>,
        policy: ReadPolicy,
    ) -> Self {
        Self {
            index,
            cache,
            coordinator,
            policy,
        }
    }

    /// Lists every recording that has, or can be given, an artifact, sorted by name.
    ///
    /// Fails with [`CatalogError::Busy`] rather than return a list built while the mirror was
    /// changing. Recordings whose transcode fails are left out.
    pub async fn list_videos(&self) -> Result<Vec<VideoEntry>, CatalogError> {
        let Some(read) = self.coordinator.begin_read(self.policy.wait()).await else {
            debug!("Catalog read refused, sync in progress");
            return Err(CatalogError::Busy);
        };

        let index = self.index.clone();
        let recordings: Vec<Recording> = tokio::task::spawn_blocking(move || index.discover().collect())
            .await
            .map_err(io::Error::other)?;
        debug!("Discovered {} recording(s)", recordings.len());

        let results = join_all(recordings.iter().map(|r| self.cache.materialize(r))).await;

        let mut videos = Vec::with_capacity(results.len());
        for (recording, result) in recordings.iter().zip(results) {
            match result {
                Ok(entry) => videos.push(VideoEntry {
                    path: access_path(&entry.file_name),
                    name: entry.file_name,
                }),
                Err(e) => warn!(
                    "Leaving {} out of the catalog: {}",
                    recording.relative_path.display(),
                    e
                ),
            }
        }

        // The files could not change under the guard, but a sync is now waiting on it.
        if self.coordinator.generation() != read.generation() {
            warn!("Sync started while building the catalog, discarding the result");
            return Err(CatalogError::Busy);
        }
        drop(read);

        videos.sort_by(|a, b| a.name.cmp(&b.name));
        info!("Catalog lists {} video(s)", videos.len());
        Ok(videos)
    }

    /// Opens the artifact called `name` for streaming. Never touches files outside the
    /// artifact directory.
    pub async fn stream_artifact(&self, name: &str) -> Result<ArtifactStream, CatalogError> {
        let path = resolve_artifact(self.cache.artifact_dir(), name).map_err(|e| {
            warn!("Rejected artifact request for {:?}", name);
            e
        })?;
        match ArtifactStream::open(&path).await {
            Ok(stream) => {
                debug!("Streaming {} ({} bytes)", path.display(), stream.len());
                Ok(stream)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(CatalogError::NotFound(name.to_string())),
            Err(e) => Err(CatalogError::Io(e)),
        }
    }
}

/// Access path for an artifact file name, percent-encoded as one path segment.
pub fn access_path(file_name: &str) -> String {
    format!("{}/{}", ACCESS_PREFIX, utf8_percent_encode(file_name, PATH_SEGMENT))
}
