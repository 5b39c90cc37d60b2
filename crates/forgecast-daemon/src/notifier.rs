// crates/forgecast-daemon/src/notifier.rs
//
// Completion notifier (C6) plus processed-set bookkeeping. One thread
// draining the worker pool's outcomes channel; the blocking POST with a
// fixed timeout follows native-helper's updater.rs ureq::...::call() shape,
// generalized from a GET auth check to a best-effort, never-retried POST.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Receiver;
use serde_json::json;
use tracing::{info, warn};

use forgecast_core::{JobOutcome, ProcessedSet};

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Spawns the notifier thread. Exits once `outcomes_rx` is closed, i.e.
/// after every worker has exited.
pub fn spawn(outcomes_rx: Receiver<JobOutcome>, processed: Arc<ProcessedSet>) -> JoinHandle<()> {
    thread::Builder::new()
        .name("notifier".into())
        .spawn(move || {
            for outcome in outcomes_rx {
                if outcome.success {
                    processed.mark(&outcome.job.input_name());
                }
                notify(&outcome);
            }
            info!("notifier exiting, outcomes channel closed");
        })
        .expect("failed to spawn notifier thread")
}

fn notify(outcome: &JobOutcome) {
    let callback_url = match outcome.job.callback_url.as_deref() {
        Some(url) if !url.is_empty() => url,
        _ => return,
    };

    let body = json!({
        "status": if outcome.success { "completed" } else { "failed" },
        "inputFile": outcome.job.input_path.to_string_lossy(),
        "outputFile": outcome.output_path.to_string_lossy(),
        "frameCount": outcome.frame_count,
        "processingTimeMs": outcome.processing_time_ms,
        "metadata": outcome.job.metadata,
    });

    let result = ureq::post(callback_url)
        .timeout(CALLBACK_TIMEOUT)
        .set("Content-Type", "application/json")
        .send_json(body);

    match result {
        Ok(_) => info!(callback_url, job_id = %outcome.job.id, "completion callback delivered"),
        Err(err) => {
            warn!(callback_url, job_id = %outcome.job.id, error = %err, "completion callback failed, not retried")
        }
    }
}
