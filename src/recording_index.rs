pub mod index;
pub mod recording;

pub use index::{Discovery, RecordingIndex};
pub use recording::{identity_for, Recording, IDENTITY_SEPARATOR};
