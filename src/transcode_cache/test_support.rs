//! Fake remuxer for cache, mirror and catalog tests.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::remux::Remuxer;
use crate::error_handling::types::TranscodeError;

/// Writes the manifest text as the artifact and counts how often it was asked to.
#[derive(Default)]
pub(crate) struct CountingRemuxer {
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
    write_output: bool,
    failing: Mutex<Vec<String>>,
}

impl CountingRemuxer {
    pub(crate) fn new() -> Self {
        Self {
            write_output: true,
            ..Default::default()
        }
    }

    /// Every remux sleeps for `delay` before producing output.
    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    /// Exits successfully without writing the output file.
    pub(crate) fn silent() -> Self {
        Self::default()
    }

    /// Remuxes of manifests whose path contains `fragment` fail after writing partial output.
    pub(crate) fn fail_on(&self, fragment: &str) {
        self.failing.lock().unwrap().push(fragment.to_string());
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of remuxes that were running at the same time.
    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Remuxer for CountingRemuxer {
    async fn remux(&self, manifest: &Path, output: &Path, _format: &str) -> Result<(), TranscodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        // Input is read up front, as ffmpeg would, so a slow remux writes what it saw at start.
        let input = std::fs::read(manifest);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let manifest_text = manifest.to_string_lossy();
        let fails = self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|fragment| manifest_text.contains(fragment.as_str()));

        let result = if fails {
            std::fs::write(output, b"truncated").unwrap();
            Err(TranscodeError::Io("simulated remux failure".into()))
        } else if self.write_output {
            input
                .map(|content| std::fs::write(output, content).unwrap())
                .map_err(|e| TranscodeError::Io(e.to_string()))
        } else {
            Ok(())
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
