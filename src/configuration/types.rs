use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, PartialEq, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Sftp,
    Directory,
}

impl Default for Transport {
    fn default() -> Self {
        Transport::Sftp
    }
}

/// Where recordings, the mirror and cached artifacts live on disk.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Local replica of the remote recording trees
    pub mirror_path: PathBuf,
    /// Directory holding one remuxed artifact per recording
    pub artifact_path: PathBuf,
    /// Recordings directory walked directly when remote sync is disabled
    pub local_recordings_path: Option<PathBuf>,
    /// A directory is a recording iff it directly contains a file with this name
    pub manifest_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mirror_path: PathBuf::from("stream-cache"),
            artifact_path: PathBuf::from("video-cache"),
            local_recordings_path: None,
            manifest_name: String::from("session.mpd"),
        }
    }
}

/// Connection to the recordings host.
#[derive(PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub enabled: bool,
    pub transport: Transport,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub private_key_path: Option<PathBuf>,
    /// Remote subtrees to mirror, each lands in `mirror_path/<last component>`
    pub roots: Vec<String>,
    pub connect_timeout_secs: u64,
    pub sync_on_startup: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            transport: Transport::default(),
            host: String::new(),
            port: 22,
            username: String::new(),
            password: None,
            private_key_path: None,
            roots: Vec::new(),
            connect_timeout_secs: 10,
            sync_on_startup: true,
        }
    }
}

// Keep the password out of `log::info!("{:?}", config)`.
impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("enabled", &self.enabled)
            .field("transport", &self.transport)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("private_key_path", &self.private_key_path)
            .field("roots", &self.roots)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("sync_on_startup", &self.sync_on_startup)
            .finish()
    }
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    pub ffmpeg_path: PathBuf,
    /// A remux still running after this many seconds is killed
    pub timeout_secs: u64,
    /// Upper bound on simultaneously running remux processes
    pub max_concurrent: usize,
    /// Artifact file extension, also used as the ffmpeg container format
    pub extension: String,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            timeout_secs: 600,
            max_concurrent: 2,
            extension: String::from("mp4"),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub bind_address: String,
    pub port: u16,
    /// How long a catalog read waits for a running sync. 0 answers busy immediately.
    pub catalog_wait_secs: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: String::from("0.0.0.0"),
            port: 5000,
            catalog_wait_secs: 0,
        }
    }
}
