use serde::{Deserialize, Serialize};

use crate::remote_mirror::SyncMode;
use crate::sync_coordinator::TriggerOutcome;

/// API error payload
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Query string of `POST /sync`
#[derive(Debug, Default, Deserialize)]
pub struct SyncQuery {
    pub mode: Option<String>,
}

impl SyncQuery {
    /// `None` for an unknown mode.
    pub fn sync_mode(&self) -> Option<SyncMode> {
        match self.mode.as_deref() {
            None | Some("") | Some("incremental") => Some(SyncMode::Incremental),
            Some("full") => Some(SyncMode::Full),
            Some(_) => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub status: TriggerOutcome,
    pub message: String,
}

impl From<TriggerOutcome> for SyncResponse {
    fn from(status: TriggerOutcome) -> Self {
        let message = match status {
            TriggerOutcome::Accepted => "Sync started",
            TriggerOutcome::AlreadyInProgress => "A sync is already in progress",
            TriggerOutcome::Disabled => "Remote sync is disabled",
        };
        Self {
            status,
            message: message.to_string(),
        }
    }
}
