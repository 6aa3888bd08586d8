//! Catalog read path: lists the available videos and streams their artifacts.

pub mod artifact_stream;
pub mod catalog_service;

pub use artifact_stream::{resolve_artifact, ArtifactStream, CHUNK_SIZE};
pub use catalog_service::{access_path, CatalogService, ReadPolicy, VideoEntry, ACCESS_PREFIX};
