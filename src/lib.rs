pub mod catalog;
pub mod configuration;
pub mod controller;
pub mod error_handling;
pub mod recording_index;
pub mod remote_mirror;
pub mod sync_coordinator;
pub mod transcode_cache;
pub mod web_interface;

pub use catalog::{CatalogService, ReadPolicy, VideoEntry};
pub use configuration::Config;
pub use recording_index::{Recording, RecordingIndex};
pub use remote_mirror::{RemoteMirror, SyncMode};
pub use sync_coordinator::{SyncCoordinator, TriggerOutcome};
pub use transcode_cache::{CacheEntry, TranscodeCache};
