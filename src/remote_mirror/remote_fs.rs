//! Transport abstraction for the recordings host.
//!
//! Implementations are blocking; the mirror drives them from a blocking task so a slow
//! host never stalls the async runtime.

use std::path::Path;

use crate::error_handling::types::TransportError;

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

/// An established session against the remote tree.
pub trait RemoteFs: Send {
    /// Lists the direct children of `path`. `.` and `..` are never returned.
    fn list_dir(&mut self, path: &str) -> Result<Vec<RemoteEntry>, TransportError>;

    /// Copies the remote file at `remote` into the local file `local`, creating or
    /// truncating it. Returns the number of bytes written.
    fn fetch(&mut self, remote: &str, local: &Path) -> Result<u64, TransportError>;
}

/// Opens sessions. One session is used for the whole of a sync run.
pub trait RemoteConnector: Send + Sync {
    fn connect(&self) -> Result<Box<dyn RemoteFs>, TransportError>;

    /// Human readable target, used in logs.
    fn describe(&self) -> String;
}

/// Joins remote path segments with `/` regardless of the local platform.
pub fn join_remote(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}
