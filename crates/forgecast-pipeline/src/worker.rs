// crates/forgecast-pipeline/src/worker.rs
//
// One worker thread's run loop (C3 driver + C4's per-slot half). Same
// thread::spawn-plus-blocking-channel-read shape as
// velocut-media/src/worker.rs's MediaWorker threads, generalized from a
// GUI-feedback loop (frame requests, playback commands, probes) to
// `while let Ok(job) = queue.pop() { process; report; }`.

use std::sync::Arc;

use crossbeam_channel::Sender;
use tracing::{error, info};

use forgecast_core::{BoundedQueue, EncoderOptions, JobOutcome, Settings, Stats};

use crate::pipeline::Pipeline;

/// A long-lived worker with identity `worker_id`. Owns exactly one
/// `Pipeline` (or none, in `--no-gpu` diagnostic mode).
pub struct WorkerSlot {
    pub worker_id: u32,
}

impl WorkerSlot {
    /// Runs until `queue.pop()` reports the queue closed. Tears down its
    /// pipeline (by dropping it) and exits.
    pub fn run(
        worker_id: u32,
        settings: &Settings,
        queue: Arc<BoundedQueue>,
        stats: Arc<Stats>,
        outcomes_tx: Sender<JobOutcome>,
    ) {
        let gpu_id = settings.gpu_for_worker(worker_id);

        let mut pipeline = if settings.no_gpu {
            None
        } else {
            let opts: EncoderOptions = settings.encoder_options_for(worker_id);
            match Pipeline::new(&opts) {
                Ok(p) => Some(p),
                Err(err) => {
                    error!(worker_id, gpu_id, error = %err, "pipeline construction failed, worker exiting");
                    return;
                }
            }
        };

        info!(worker_id, gpu_id, no_gpu = settings.no_gpu, "worker started");

        loop {
            let job = match queue.pop() {
                Ok(job) => job,
                Err(_closed) => break,
            };

            let outcome = match pipeline.as_mut() {
                Some(pipeline) => pipeline.process_file(&job, &settings.output_dir),
                None => diagnostic_outcome(&job),
            };

            if outcome.success {
                stats.record_success();
            } else {
                stats.record_failure();
            }

            if outcomes_tx.send(outcome).is_err() {
                // Notifier/stats consumer gone (shutting down) — keep draining the
                // queue so remaining jobs still get decremented from queue_depth.
            }
        }

        info!(worker_id, gpu_id, "worker exiting, pipeline released");
    }
}

/// `--no-gpu` diagnostic mode: acknowledges the job without transcoding.
/// Preserves the source's deliberately inconsistent callback shape verbatim
/// (input path reported as output, frameCount 0).
fn diagnostic_outcome(job: &forgecast_core::Job) -> JobOutcome {
    JobOutcome {
        job: job.clone(),
        success: true,
        output_path: job.input_path.clone(),
        frame_count: 0,
        processing_time_ms: 0,
        error: None,
    }
}
