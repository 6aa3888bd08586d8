use std::sync::Arc;

use log::{debug, info, warn};

use crate::catalog::{CatalogService, ReadPolicy};
use crate::configuration::{Config, Transport};
use crate::error_handling::types::*;
use crate::recording_index::RecordingIndex;
use crate::remote_mirror::{DirectoryConnector, RemoteConnector, RemoteMirror, SftpConnector, SyncMode};
use crate::sync_coordinator::{SyncCoordinator, TriggerOutcome};
use crate::transcode_cache::{FfmpegRemuxer, TranscodeCache};
use crate::web_interface::WebServer;

/// Wires the mirror, cache, catalog and web surface together from one configuration.
pub struct Controller {
    config: Arc<Config>,
    coordinator: Arc<SyncCoordinator>,
    catalog: Arc<CatalogService>,
    startup_sync: bool,
}

impl Controller {
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        config.validate()?;
        let config = Arc::new(config);

        let remuxer = Arc::new(FfmpegRemuxer::new(
            config.transcode.ffmpeg_path.clone(),
            config.remux_timeout(),
        ));
        let cache = Arc::new(TranscodeCache::new(
            config.storage.artifact_path.clone(),
            &config.transcode.extension,
            remuxer,
            config.transcode.max_concurrent,
        ));
        debug!(
            "Artifact cache at {} ({} worker(s))",
            cache.artifact_dir().display(),
            config.transcode.max_concurrent
        );

        let mirror = if config.remote.enabled {
            let connector: Arc<dyn RemoteConnector> = match config.remote.transport {
                Transport::Sftp => Arc::new(SftpConnector::new(&config.remote)),
                Transport::Directory => Arc::new(DirectoryConnector::new()),
            };
            info!(
                "Mirroring {} root(s) from {} into {}",
                config.remote.roots.len(),
                connector.describe(),
                config.storage.mirror_path.display()
            );
            Some(Arc::new(RemoteMirror::new(
                connector,
                config.remote.roots.clone(),
                config.storage.mirror_path.clone(),
                Arc::clone(&cache),
            )))
        } else {
            info!("Remote sync disabled, serving recordings from {}", config.recordings_root().display());
            None
        };
        let coordinator = SyncCoordinator::new(mirror);

        let index = RecordingIndex::new(
            config.recordings_root(),
            config.storage.manifest_name.clone(),
            config.recognized_subtrees(),
        );
        let catalog = Arc::new(CatalogService::new(
            index,
            cache,
            Arc::clone(&coordinator),
            ReadPolicy::from_wait(config.catalog_wait()),
        ));

        Ok(Self {
            startup_sync: config.remote.enabled && config.remote.sync_on_startup,
            config,
            coordinator,
            catalog,
        })
    }

    /// Keeps `run` from triggering the startup sync.
    pub fn skip_startup_sync(&mut self) {
        self.startup_sync = false;
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    pub fn catalog(&self) -> &Arc<CatalogService> {
        &self.catalog
    }

    /// Triggers the startup sync if one is configured. Returns what the trigger did.
    pub fn startup(&self) -> Option<TriggerOutcome> {
        if !self.startup_sync {
            debug!("No startup sync configured");
            return None;
        }
        info!("Triggering startup sync");
        let outcome = self.coordinator.trigger(SyncMode::Incremental);
        if outcome != TriggerOutcome::Accepted {
            warn!("Startup sync not started: {:?}", outcome);
        }
        Some(outcome)
    }

    /// Runs the startup sync in the background and serves HTTP until shutdown.
    pub async fn run(&mut self) -> Result<(), ControllerError> {
        self.startup();

        let server = WebServer::new(Arc::clone(&self.catalog), Arc::clone(&self.coordinator));
        server
            .start(&self.config.web.bind_address, self.config.web.port)
            .await?;

        info!("Controller stopped");
        Ok(())
    }
}
