// crates/forgecast-core/src/queue.rs
//
// Bounded FIFO job queue (C1). Two condition variables gate the two
// suspension points: `not_full` wakes a blocked `push`, `not_empty` wakes a
// blocked `pop`. Shutdown is a flag inside the same lock so `close()` can
// broadcast both condvars atomically with respect to concurrent push/pop.
//
// This generalizes the single-slot "latest wins" Arc<(Mutex<Option<T>>,
// Condvar)> cell velocut-media/src/worker.rs uses for frame requests into an
// ordered multi-item FIFO — same primitive, different capacity and discipline.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use crate::job::Job;

struct Inner {
    items: VecDeque<Job>,
    capacity: usize,
    shutdown: bool,
}

/// Returned by `pop()` when the queue has been closed and drained.
#[derive(Debug, PartialEq, Eq)]
pub struct PopError;

pub struct BoundedQueue {
    inner: Mutex<Inner>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl BoundedQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity.min(64)),
                capacity,
                shutdown: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap().capacity
    }

    /// Blocks while the queue is full. Appends at the tail and wakes one
    /// blocked consumer. No-op (job dropped) if the queue has already been
    /// closed — callers are expected to stop producing before that happens.
    pub fn push(&self, job: Job) {
        let mut guard = self.inner.lock().unwrap();
        while guard.items.len() >= guard.capacity && !guard.shutdown {
            guard = self.not_full.wait(guard).unwrap();
        }
        if guard.shutdown {
            return;
        }
        guard.items.push_back(job);
        self.not_empty.notify_one();
    }

    /// Blocks while the queue is empty and not shut down. Returns `Ok(job)`
    /// with the head of the queue, waking one blocked producer, or `Err`
    /// once the queue is closed and fully drained.
    pub fn pop(&self) -> Result<Job, PopError> {
        let mut guard = self.inner.lock().unwrap();
        loop {
            if let Some(job) = guard.items.pop_front() {
                self.not_full.notify_one();
                return Ok(job);
            }
            if guard.shutdown {
                return Err(PopError);
            }
            guard = self.not_empty.wait(guard).unwrap();
        }
    }

    /// Instantaneous size. May be stale the instant it's read.
    pub fn depth(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    /// Sets the shutdown flag and wakes every blocked producer and consumer.
    /// Idempotent — closing an already-closed queue is a no-op.
    pub fn close(&self) {
        let mut guard = self.inner.lock().unwrap();
        if guard.shutdown {
            return;
        }
        guard.shutdown = true;
        drop(guard);
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn job(name: &str) -> Job {
        Job::new(PathBuf::from(name), None, None)
    }

    #[test]
    fn fifo_order_single_producer() {
        let q = BoundedQueue::new(8);
        for n in ["a", "b", "c"] {
            q.push(job(n));
        }
        assert_eq!(q.pop().unwrap().input_path, PathBuf::from("a"));
        assert_eq!(q.pop().unwrap().input_path, PathBuf::from("b"));
        assert_eq!(q.pop().unwrap().input_path, PathBuf::from("c"));
    }

    #[test]
    fn depth_never_exceeds_capacity() {
        let q = Arc::new(BoundedQueue::new(2));
        q.push(job("1"));
        q.push(job("2"));
        assert_eq!(q.depth(), 2);

        let q2 = q.clone();
        let handle = thread::spawn(move || {
            // Blocks until a slot frees up.
            q2.push(job("3"));
        });
        thread::sleep(Duration::from_millis(50));
        assert_eq!(q.depth(), 2); // still full, push is blocked
        q.pop().unwrap();
        handle.join().unwrap();
        assert!(q.depth() <= 2);
    }

    #[test]
    fn pop_blocks_then_returns_closed_once_drained() {
        let q = Arc::new(BoundedQueue::new(4));
        q.push(job("only"));

        let q2 = q.clone();
        let handle = thread::spawn(move || {
            assert!(q2.pop().is_ok());
            assert_eq!(q2.pop(), Err(PopError));
        });

        thread::sleep(Duration::from_millis(20));
        q.close();
        handle.join().unwrap();
    }

    #[test]
    fn close_is_idempotent() {
        let q = BoundedQueue::new(4);
        q.close();
        q.close();
        assert_eq!(q.pop(), Err(PopError));
    }
}
