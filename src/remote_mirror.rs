//! Remote mirror subsystem
//!
//! Replicates the recording trees of the remote host into the local mirror directory.
//!
//! Components:
//! - `remote_fs`: the blocking `RemoteFs`/`RemoteConnector` transport traits.
//! - `sftp`: SSH/SFTP transport used against the recordings host.
//! - `directory`: transport for trees reachable through a mounted filesystem.
//! - `mirror`: the `RemoteMirror` sync engine (incremental and full runs).

pub mod directory;
pub mod mirror;
pub mod remote_fs;
pub mod sftp;
#[cfg(test)]
pub(crate) mod test_support;

pub use directory::DirectoryConnector;
pub use mirror::{RemoteMirror, SyncMode, SyncReport};
pub use remote_fs::{RemoteConnector, RemoteEntry, RemoteFs};
pub use sftp::SftpConnector;
