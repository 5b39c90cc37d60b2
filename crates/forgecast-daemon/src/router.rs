// crates/forgecast-daemon/src/router.rs
//
// Single enqueue contract shared by the HTTP adapter and the batch scanner
// (C5). Normalizes input_path to an absolute path before constructing the
// Job regardless of which adapter called it, so nothing downstream ever has
// to distinguish "bare filename" from "full path" again.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use forgecast_core::{BoundedQueue, Job, Settings};

#[derive(Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    Queued { queue_depth: usize },
    NotFound,
    QueueFull,
}

pub struct Router {
    queue: Arc<BoundedQueue>,
    settings: Arc<Settings>,
}

impl Router {
    pub fn new(queue: Arc<BoundedQueue>, settings: Arc<Settings>) -> Self {
        Self { queue, settings }
    }

    /// `input_path` may already be absolute (HTTP) or a bare filename
    /// (scanner); either way it's joined against `input_dir` before the
    /// existence and soft-cap checks run.
    pub fn enqueue(
        &self,
        input_path: &str,
        callback_url: Option<String>,
        metadata: Option<Value>,
    ) -> RouteOutcome {
        let normalized = self.normalize(input_path);

        if !normalized.is_file() {
            return RouteOutcome::NotFound;
        }

        if self.queue.depth() >= self.settings.soft_cap() {
            return RouteOutcome::QueueFull;
        }

        let job = Job::new(normalized, callback_url, metadata);
        self.queue.push(job);
        RouteOutcome::Queued { queue_depth: self.queue.depth() }
    }

    fn normalize(&self, input_path: &str) -> PathBuf {
        let path = Path::new(input_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.settings.input_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgecast_core::BoundedQueue;
    use std::fs;

    fn router(queue_capacity: usize, input_dir: PathBuf) -> (Router, Arc<BoundedQueue>) {
        let queue = Arc::new(BoundedQueue::new(queue_capacity));
        let settings = Arc::new(Settings {
            port: 8080,
            workers: 1,
            gpus: 1,
            queue_capacity,
            input_dir,
            output_dir: PathBuf::from("out"),
            stagger_ms: 0,
            no_gpu: true,
            batch: false,
            processed_ring_capacity: 16,
        });
        (Router::new(queue.clone(), settings), queue)
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (router, _queue) = router(4, dir.path().to_path_buf());
        let outcome = router.enqueue("missing.ts", None, None);
        assert_eq!(outcome, RouteOutcome::NotFound);
    }

    #[test]
    fn existing_absolute_path_is_queued() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.ts");
        fs::write(&file, b"ts-data").unwrap();
        let (router, _queue) = router(4, dir.path().to_path_buf());
        let outcome = router.enqueue(file.to_str().unwrap(), None, None);
        assert_eq!(outcome, RouteOutcome::Queued { queue_depth: 1 });
    }

    #[test]
    fn bare_filename_is_joined_against_input_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.ts"), b"ts-data").unwrap();
        let (router, _queue) = router(4, dir.path().to_path_buf());
        let outcome = router.enqueue("b.ts", None, None);
        assert_eq!(outcome, RouteOutcome::Queued { queue_depth: 1 });
    }

    #[test]
    fn queue_full_is_rejected_before_push() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), b"ts-data").unwrap();
        fs::write(dir.path().join("b.ts"), b"ts-data").unwrap();
        let (router, queue) = router(1, dir.path().to_path_buf());
        assert_eq!(router.enqueue("a.ts", None, None), RouteOutcome::Queued { queue_depth: 1 });
        assert_eq!(router.enqueue("b.ts", None, None), RouteOutcome::QueueFull);
        assert_eq!(queue.depth(), 1);
    }
}
