use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::process::Command;

use crate::error_handling::types::TranscodeError;

/// Repackages a manifest's media streams into one container file without re-encoding.
///
/// A nonzero exit, a timeout or a missing output file are all failures.
#[async_trait]
pub trait Remuxer: Send + Sync {
    async fn remux(&self, manifest: &Path, output: &Path, format: &str) -> Result<(), TranscodeError>;
}

/// Muxer name understood by ffmpeg's `-f` for an artifact extension.
pub fn container_format(extension: &str) -> &str {
    match extension {
        "mkv" => "matroska",
        "ts" => "mpegts",
        other => other,
    }
}

/// Runs `ffmpeg -c copy`, killing it when it outlives `timeout`.
#[derive(Debug, Clone)]
pub struct FfmpegRemuxer {
    program: PathBuf,
    timeout: Duration,
}

impl FfmpegRemuxer {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn command(&self, manifest: &Path, output: &Path, format: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-y")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(manifest)
            .arg("-c")
            .arg("copy")
            .arg("-f")
            .arg(format)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Remuxer for FfmpegRemuxer {
    async fn remux(&self, manifest: &Path, output: &Path, format: &str) -> Result<(), TranscodeError> {
        debug!(
            "Running {} on {} -> {} ({})",
            self.program.display(),
            manifest.display(),
            output.display(),
            format
        );
        let child = self
            .command(manifest, output, format)
            .spawn()
            .map_err(|e| TranscodeError::Spawn(format!("{}: {}", self.program.display(), e)))?;

        // Dropping the child on timeout kills it.
        let result = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| TranscodeError::Io(e.to_string()))?,
            Err(_) => {
                warn!(
                    "Remux of {} exceeded {:?}, killing it",
                    manifest.display(),
                    self.timeout
                );
                return Err(TranscodeError::Timeout(self.timeout.as_secs()));
            }
        };

        if !result.status.success() {
            return Err(TranscodeError::Failed {
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        if !output.is_file() {
            return Err(TranscodeError::MissingOutput(output.to_path_buf()));
        }
        Ok(())
    }
}
