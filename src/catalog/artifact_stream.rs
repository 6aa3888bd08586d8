use std::io;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::error_handling::types::CatalogError;

/// Bytes handed out per chunk when streaming an artifact.
pub const CHUNK_SIZE: usize = 4096;

/// Maps an artifact name onto a file directly inside `artifact_dir`.
///
/// Anything that is not a single plain file name is rejected before the filesystem is
/// touched: separators, `.`/`..`, absolute paths and hidden names (in-progress transcodes
/// are hidden files).
pub fn resolve_artifact(artifact_dir: &Path, name: &str) -> Result<PathBuf, CatalogError> {
    let not_found = || CatalogError::NotFound(name.to_string());

    if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\', '\0']) {
        return Err(not_found());
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Ok(artifact_dir.join(part)),
        _ => Err(not_found()),
    }
}

/// Sequential read of one artifact in [`CHUNK_SIZE`] chunks.
pub struct ArtifactStream {
    len: u64,
    inner: ReaderStream<File>,
}

impl ArtifactStream {
    pub async fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path).await?;
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "not a regular file"));
        }
        Ok(Self {
            len: metadata.len(),
            inner: ReaderStream::with_capacity(file, CHUNK_SIZE),
        })
    }

    /// Size of the artifact when it was opened.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Stream for ArtifactStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
