//! Transcode cache
//!
//! Turns a recording's fragmented manifest into one cached artifact file, at most once per
//! recording identity.
//!
//! Components:
//! - `manifest`: normalizes the Period start of a manifest before remuxing.
//! - `remux`: the `Remuxer` trait and its ffmpeg implementation.
//! - `keyed_lock`: per-identity async locks.
//! - `cache`: `TranscodeCache`, tying the above to the artifact directory.

pub mod cache;
pub mod keyed_lock;
pub mod manifest;
pub mod remux;
#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{CacheEntry, TranscodeCache};
pub use keyed_lock::KeyedLocks;
pub use manifest::normalize_period_start;
pub use remux::{FfmpegRemuxer, Remuxer};
