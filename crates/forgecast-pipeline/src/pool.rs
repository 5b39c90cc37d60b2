// crates/forgecast-pipeline/src/pool.rs
//
// Fixed-size worker pool (C4). Spawns `W` worker threads with a small
// inter-spawn delay to avoid thundering-herd contention on the GPU driver
// during session creation — the same staggered-construction
// discipline velocut-media/src/worker.rs relies on implicitly via its
// probe-concurrency semaphore, made explicit here as a plain sleep between
// `thread::spawn` calls.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;

use forgecast_core::{BoundedQueue, JobOutcome, Settings, Stats};

use crate::worker::WorkerSlot;

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `settings.workers` worker threads, `settings.stagger_ms` apart.
    pub fn spawn(
        settings: Arc<Settings>,
        queue: Arc<BoundedQueue>,
        stats: Arc<Stats>,
        outcomes_tx: Sender<JobOutcome>,
    ) -> Self {
        let mut handles = Vec::with_capacity(settings.workers as usize);

        for worker_id in 0..settings.workers {
            let settings = settings.clone();
            let queue = queue.clone();
            let stats = stats.clone();
            let outcomes_tx = outcomes_tx.clone();

            let handle = thread::Builder::new()
                .name(format!("worker-{worker_id}"))
                .spawn(move || {
                    WorkerSlot::run(worker_id, &settings, queue, stats, outcomes_tx);
                })
                .expect("failed to spawn worker thread");

            handles.push(handle);

            if worker_id + 1 < settings.workers {
                thread::sleep(Duration::from_millis(settings.stagger_ms));
            }
        }

        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Blocks until every worker has exited. Callers close the queue first
    /// so `pop()` returns `Closed` and each worker's loop ends naturally.
    pub fn join_all(self) {
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}
