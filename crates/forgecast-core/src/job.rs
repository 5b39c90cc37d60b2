// crates/forgecast-core/src/job.rs
//
// Plain data shared across the queue, the workers and the notifier.
// No ffmpeg, no HTTP types — just the wire-level shape of a unit of work.

use std::path::PathBuf;
use std::time::Instant;

use serde_json::Value;
use uuid::Uuid;

/// One unit of work accepted by the router (C5) and consumed by a worker (C3).
///
/// `input_path` is always normalized to an absolute path by the router before
/// the `Job` is constructed — see `forgecast-daemon::router` — regardless of
/// whether it arrived as a full path (HTTP) or a bare filename (scanner).
#[derive(Clone, Debug)]
pub struct Job {
    pub id: Uuid,
    pub input_path: PathBuf,
    pub callback_url: Option<String>,
    pub metadata: Option<Value>,
    /// Wall-clock instant the router accepted this job. Used to compute
    /// `processingTimeMs` in the completion callback. Not part of any wire format.
    pub submitted_at: Instant,
}

impl Job {
    pub fn new(input_path: PathBuf, callback_url: Option<String>, metadata: Option<Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            input_path,
            callback_url,
            metadata,
            submitted_at: Instant::now(),
        }
    }

    pub fn input_name(&self) -> String {
        self.input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input_path.to_string_lossy().into_owned())
    }

    /// `<basename_without_".ts">_h264.ts`, joined onto `output_dir`.
    pub fn output_path(&self, output_dir: &std::path::Path) -> PathBuf {
        let stem = self
            .input_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input_name());
        output_dir.join(format!("{stem}_h264.ts"))
    }
}

/// Result of running one job through a worker. Carries everything the
/// notifier and stats registry need, independent of how the job failed.
#[derive(Clone, Debug)]
pub struct JobOutcome {
    pub job: Job,
    pub success: bool,
    pub output_path: PathBuf,
    pub frame_count: u64,
    pub processing_time_ms: u64,
    pub error: Option<String>,
}
