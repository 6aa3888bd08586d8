use super::types::*;
use crate::error_handling::types::ConfigError;
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration structure that defines all runtime parameters.
///
/// This structure holds the complete configuration for the application: where the mirror and
/// the artifact cache live, how to reach the recordings host, how the external remux process is
/// run and where the HTTP surface listens. It is read once from a TOML file and is immutable
/// afterwards; components receive the sections they need at construction.
///
/// # Examples
///
/// ```
/// use recmirror::configuration::config::Config;
///
/// let config = Config::from_toml_str(r#"
///     [storage]
///     local_recordings_path = "/srv/recordings"
/// "#).unwrap();
/// assert_eq!(config.web.port, 5000);
/// assert!(!config.remote.enabled);
/// ```
///
/// # Fields Overview
///
/// - `storage`: mirror directory, artifact directory, local recordings, manifest filename
/// - `remote`: host, credentials and the remote roots to mirror
/// - `transcode`: remux binary, timeout and worker-pool size
/// - `web`: bind address, port and how long catalog reads wait for a sync
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub remote: RemoteConfig,
    pub transcode: TranscodeConfig,
    pub web: WebConfig,
}

impl Config {
    /// Reads and validates the configuration file at `path`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        debug!("Read {} byte(s) of configuration from {}", content.len(), path.display());
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote.enabled {
            if self.remote.roots.is_empty() {
                return Err(ConfigError::RemoteIncomplete(
                    "at least one remote root is required".to_string(),
                ));
            }
            if self.remote.transport == Transport::Sftp {
                if self.remote.host.is_empty() || self.remote.username.is_empty() {
                    return Err(ConfigError::RemoteIncomplete(
                        "host and username are required for sftp".to_string(),
                    ));
                }
                if self.remote.password.is_none() && self.remote.private_key_path.is_none() {
                    return Err(ConfigError::RemoteIncomplete(
                        "either password or private_key_path is required".to_string(),
                    ));
                }
            }

            let mut seen: HashMap<String, &String> = HashMap::new();
            for root in &self.remote.roots {
                let name = root_dir_name(root).ok_or_else(|| {
                    ConfigError::RemoteIncomplete(format!("remote root {} has no name", root))
                })?;
                if let Some(previous) = seen.insert(name, root) {
                    return Err(ConfigError::DuplicateRoot(previous.clone(), root.clone()));
                }
            }
        } else if self.storage.local_recordings_path.is_none() {
            return Err(ConfigError::StorageIncomplete(
                "local_recordings_path is required when remote sync is disabled".to_string(),
            ));
        }

        if self.storage.manifest_name.is_empty() || self.storage.manifest_name.contains('/') {
            return Err(ConfigError::StorageIncomplete(format!(
                "invalid manifest name {:?}",
                self.storage.manifest_name
            )));
        }
        if self.transcode.max_concurrent == 0 {
            return Err(ConfigError::NotInRange(
                "transcode.max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.transcode.timeout_secs == 0 {
            return Err(ConfigError::NotInRange(
                "transcode.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory the recording index walks: the mirror when syncing from a remote host,
    /// the local recordings folder otherwise.
    pub fn recordings_root(&self) -> PathBuf {
        match (&self.storage.local_recordings_path, self.remote.enabled) {
            (Some(local), false) => local.clone(),
            _ => self.storage.mirror_path.clone(),
        }
    }

    /// Local subtree names the index recognizes, `None` when any subtree is accepted.
    pub fn recognized_subtrees(&self) -> Option<Vec<String>> {
        if !self.remote.enabled {
            return None;
        }
        Some(self.remote.roots.iter().filter_map(|r| root_dir_name(r)).collect())
    }

    pub fn remux_timeout(&self) -> Duration {
        Duration::from_secs(self.transcode.timeout_secs)
    }

    pub fn catalog_wait(&self) -> Duration {
        Duration::from_secs(self.web.catalog_wait_secs)
    }
}

/// Name of the local mirror subdirectory for a remote root: its last path component.
pub fn root_dir_name(root: &str) -> Option<String> {
    root.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map(str::to_string)
}
