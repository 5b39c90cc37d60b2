// crates/forgecast-core/src/stats.rs
//
// Monotonic counters + gauges guarded by a single mutex (C7). `queue_depth`
// isn't stored here — it's always read live from the queue at snapshot time
// so it can never drift from the real thing.

use std::time::Instant;

use parking_lot::Mutex;

struct Inner {
    processed: u64,
    failed: u64,
}

pub struct Stats {
    inner: Mutex<Inner>,
    start_time: Instant,
}

#[derive(Clone, Copy, Debug)]
pub struct Snapshot {
    pub processed: u64,
    pub failed: u64,
    pub uptime_seconds: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner { processed: 0, failed: 0 }),
            start_time: Instant::now(),
        }
    }

    pub fn record_success(&self) {
        self.inner.lock().processed += 1;
    }

    pub fn record_failure(&self) {
        self.inner.lock().failed += 1;
    }

    pub fn snapshot(&self) -> Snapshot {
        let guard = self.inner.lock();
        Snapshot {
            processed: guard.processed,
            failed: guard.failed,
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processed_plus_failed_equals_completed() {
        let stats = Stats::new();
        stats.record_success();
        stats.record_success();
        stats.record_failure();
        let snap = stats.snapshot();
        assert_eq!(snap.processed + snap.failed, 3);
    }
}
