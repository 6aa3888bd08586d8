use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlError(String),
    #[error("Remote configuration error: {0}")]
    RemoteIncomplete(String),
    #[error("Storage configuration error: {0}")]
    StorageIncomplete(String),
    #[error("Value out of range: {0}")]
    NotInRange(String),
    #[error("Remote roots {0} and {1} would mirror into the same local directory")]
    DuplicateRoot(String, String),
}

/// Failures talking to the recordings host.
///
/// `Connect`, `Timeout` and `Auth` abort a whole sync; the per-item variants only skip that item.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection to {0} failed: {1}")]
    Connect(String, String),
    #[error("Authentication as {0} failed: {1}")]
    Auth(String, String),
    #[error("Listing {0} failed: {1}")]
    List(String, String),
    #[error("Fetching {0} failed: {1}")]
    Fetch(String, String),
    #[error("Connection to {0} timed out after {1:?}")]
    Timeout(String, std::time::Duration),
}

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("A sync is already in progress")]
    AlreadySyncing,
    #[error("Remote sync is disabled")]
    Disabled,
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Mirror IO error on {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("Sync task failed: {0}")]
    Task(String),
}

/// Failures producing one artifact. Always scoped to a single recording.
///
/// `Clone` so a single failed transcode can be reported to every caller that waited on it.
#[derive(Debug, Clone, Error)]
pub enum TranscodeError {
    #[error("Manifest {0} could not be patched: {1}")]
    Manifest(PathBuf, String),
    #[error("Failed to spawn remux process: {0}")]
    Spawn(String),
    #[error("Remux process exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
    #[error("Remux process exceeded {0} seconds and was killed")]
    Timeout(u64),
    #[error("Remux process reported success but produced no output at {0}")]
    MissingOutput(PathBuf),
    #[error("Transcode IO error: {0}")]
    Io(String),
    #[error("Transcode worker pool is closed")]
    WorkerFailed,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("A sync is in progress, catalog is unavailable")]
    Busy,
    #[error("Artifact not found: {0}")]
    NotFound(String),
    #[error("Catalog IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("Unable to bind web server on {0}: {1}")]
    BindFailed(String, String),
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Configuration error: {0}")]
    ConfigurationError(#[from] ConfigError),
    #[error("Web error: {0}")]
    WebError(#[from] WebError),
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),
}
