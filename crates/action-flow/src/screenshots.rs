//! Checkpoint screenshots

use action_primitives::{DriverError, DriverPort};
use chrono::Utc;
use formpilot_core_types::RunId;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Upper bound for a single capture; runs past their deadline still get one try.
pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// Page ready, before any field is touched
    Before,
    /// Right before a fatal transition
    Failure,
    /// Run completed
    After,
}

impl Checkpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Checkpoint::Before => "before",
            Checkpoint::Failure => "failure",
            Checkpoint::After => "after",
        }
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ScreenshotError {
    #[error("could not create screenshot directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("driver could not capture screenshot: {0}")]
    Driver(#[from] DriverError),

    #[error("screenshot capture timed out after {0:?}")]
    Timeout(Duration),

    #[error("could not write screenshot {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes checkpoint screenshots for one run
///
/// Names are `<run prefix>_<seq>_<checkpoint>_<UTC timestamp>.png`; the
/// sequence number keeps names unique within a run.
#[derive(Debug)]
pub struct ScreenshotRecorder {
    dir: Option<PathBuf>,
    prefix: String,
    seq: u32,
}

impl ScreenshotRecorder {
    pub fn new(dir: Option<PathBuf>, run_id: &RunId) -> Self {
        Self {
            dir,
            prefix: run_id.short().to_string(),
            seq: 0,
        }
    }

    pub fn enabled(&self) -> bool {
        self.dir.is_some()
    }

    pub fn file_name(&self, seq: u32, checkpoint: Checkpoint) -> String {
        format!(
            "{}_{:02}_{}_{}.png",
            self.prefix,
            seq,
            checkpoint,
            Utc::now().format("%Y%m%dT%H%M%S%.3fZ")
        )
    }

    /// Capture and write one screenshot; `Ok(None)` when no directory is configured
    pub async fn capture(
        &mut self,
        driver: &dyn DriverPort,
        checkpoint: Checkpoint,
    ) -> Result<Option<PathBuf>, ScreenshotError> {
        let Some(dir) = self.dir.clone() else {
            debug!(%checkpoint, "screenshots disabled");
            return Ok(None);
        };
        self.seq += 1;
        let path = dir.join(self.file_name(self.seq, checkpoint));

        ensure_dir(&dir).await?;
        let bytes = tokio::time::timeout(CAPTURE_TIMEOUT, driver.screenshot())
            .await
            .map_err(|_| ScreenshotError::Timeout(CAPTURE_TIMEOUT))??;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| ScreenshotError::Write {
                path: path.clone(),
                source,
            })?;

        debug!(%checkpoint, path = %path.display(), bytes = bytes.len(), "screenshot written");
        Ok(Some(path))
    }
}

async fn ensure_dir(dir: &Path) -> Result<(), ScreenshotError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ScreenshotError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })
}
