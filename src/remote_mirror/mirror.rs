use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info, trace, warn};
use serde::Serialize;

use super::remote_fs::{join_remote, RemoteConnector, RemoteFs};
use crate::configuration::config::root_dir_name;
use crate::error_handling::types::MirrorError;
use crate::sync_coordinator::SyncPermit;
use crate::transcode_cache::TranscodeCache;

/// How a sync treats what is already in the local mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Files already present locally are not fetched again.
    Incremental,
    /// Wipe the mirror and the artifact cache, then fetch everything.
    Full,
}

/// Counters for one mirror run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub directories: usize,
    pub fetched: usize,
    pub skipped: usize,
    pub failed: usize,
    pub bytes: u64,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} dir(s), {} fetched ({} bytes), {} already present, {} failed",
            self.directories, self.fetched, self.bytes, self.skipped, self.failed
        )
    }
}

/// Replicates the configured remote roots into the local mirror directory.
///
/// Each root `/some/remote/<name>` lands in `<mirror_path>/<name>`. Item-level failures are
/// logged and counted, never fatal; only failing to connect aborts a run.
pub struct RemoteMirror {
    connector: Arc<dyn RemoteConnector>,
    roots: Vec<String>,
    mirror_path: PathBuf,
    cache: Arc<TranscodeCache>,
}

impl RemoteMirror {
    pub fn new(
        connector: Arc<dyn RemoteConnector>,
        roots: Vec<String>,
        mirror_path: PathBuf,
        cache: Arc<TranscodeCache>,
    ) -> Self {
        Self {
            connector,
            roots,
            mirror_path,
            cache,
        }
    }

    pub fn mirror_path(&self) -> &Path {
        &self.mirror_path
    }

    /// Runs one mirror pass. Holding `permit` is what makes this the only running sync; it is
    /// released when this returns, successfully or not. Catalog builds already running are
    /// drained before any file is touched.
    pub async fn sync(&self, mut permit: SyncPermit, mode: SyncMode) -> Result<SyncReport, MirrorError> {
        permit.exclusive().await;
        info!(
            "Starting {:?} sync from {} into {}",
            mode,
            self.connector.describe(),
            self.mirror_path.display()
        );

        if mode == SyncMode::Full {
            self.wipe().await?;
        }

        let connector = Arc::clone(&self.connector);
        let roots = self.roots.clone();
        let mirror_path = self.mirror_path.clone();
        let report = tokio::task::spawn_blocking(move || {
            mirror_roots(connector.as_ref(), &roots, &mirror_path)
        })
        .await
        .map_err(|e| MirrorError::Task(e.to_string()))??;

        info!("Sync completed: {}", report);
        permit.complete();
        Ok(report)
    }

    /// Deletes the mirror and every cached artifact.
    async fn wipe(&self) -> Result<(), MirrorError> {
        warn!("Wiping mirror {} for a full sync", self.mirror_path.display());
        match tokio::fs::remove_dir_all(&self.mirror_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(MirrorError::Io(self.mirror_path.clone(), e)),
        }
        self.cache
            .invalidate()
            .await
            .map_err(|e| MirrorError::Io(self.cache.artifact_dir().to_path_buf(), e))
    }
}

fn mirror_roots(
    connector: &dyn RemoteConnector,
    roots: &[String],
    mirror_path: &Path,
) -> Result<SyncReport, MirrorError> {
    fs::create_dir_all(mirror_path).map_err(|e| MirrorError::Io(mirror_path.to_path_buf(), e))?;

    let mut remote = connector.connect()?;
    let mut report = SyncReport::default();

    for root in roots {
        let Some(name) = root_dir_name(root) else {
            warn!("Skipping remote root {} without a usable name", root);
            continue;
        };
        debug!("Mirroring {} into {}", root, mirror_path.join(&name).display());
        copy_tree(remote.as_mut(), root, &mirror_path.join(name), &mut report);
    }
    Ok(report)
}

fn copy_tree(remote: &mut dyn RemoteFs, remote_dir: &str, local_dir: &Path, report: &mut SyncReport) {
    if let Err(e) = fs::create_dir_all(local_dir) {
        error!("Failed to create local directory {}: {}", local_dir.display(), e);
        report.failed += 1;
        return;
    }
    report.directories += 1;

    let entries = match remote.list_dir(remote_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Skipping remote directory: {}", e);
            report.failed += 1;
            return;
        }
    };

    for entry in entries {
        if !is_plain_name(&entry.name) {
            warn!("Skipping entry with unsafe name {:?} in {}", entry.name, remote_dir);
            continue;
        }
        let remote_item = join_remote(remote_dir, &entry.name);
        let local_item = local_dir.join(&entry.name);

        if entry.is_dir {
            copy_tree(remote, &remote_item, &local_item, report);
            continue;
        }
        if local_item.exists() {
            trace!("{} already mirrored", local_item.display());
            report.skipped += 1;
            continue;
        }
        match fetch_file(remote, &remote_item, &local_item) {
            Ok(bytes) => {
                debug!("Fetched {} ({} bytes)", remote_item, bytes);
                report.fetched += 1;
                report.bytes += bytes;
            }
            Err(e) => {
                warn!("Skipping {}: {}", remote_item, e);
                report.failed += 1;
            }
        }
    }
}

/// Downloads into a `.part` sibling and renames, so the target only exists once complete.
fn fetch_file(remote: &mut dyn RemoteFs, remote_item: &str, local_item: &Path) -> Result<u64, MirrorError> {
    let partial = partial_path(local_item);
    match remote.fetch(remote_item, &partial) {
        Ok(bytes) => {
            fs::rename(&partial, local_item).map_err(|e| MirrorError::Io(local_item.to_path_buf(), e))?;
            Ok(bytes)
        }
        Err(e) => {
            let _ = fs::remove_file(&partial);
            Err(e.into())
        }
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/') && !name.contains('\\')
}
