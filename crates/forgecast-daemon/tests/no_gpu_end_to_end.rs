// crates/forgecast-daemon/tests/no_gpu_end_to_end.rs
//
// Drives router -> queue -> worker -> notifier without a GPU, using a
// loopback tiny_http server standing in for the caller-supplied callback
// endpoint. Exercises the full no-GPU diagnostic path end to end, the way
// the no-GPU mode is meant to be exercisable in CI without hardware.

use std::fs;
use std::io::Read;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};
use tiny_http::{Response, Server};

use forgecast_core::{BoundedQueue, ProcessedSet, Settings, Stats};
use forgecast_daemon::{notifier, RouteOutcome, Router};
use forgecast_pipeline::WorkerPool;

#[test]
fn no_gpu_job_round_trips_through_callback() {
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();
    let input_file = input_dir.path().join("a.ts");
    fs::write(&input_file, b"fake-ts-data").unwrap();

    // Loopback callback receiver: accept exactly one request, hand its body
    // back over a channel, then exit.
    let callback_server = Server::http("127.0.0.1:0").unwrap();
    let callback_addr = callback_server.server_addr();
    let (body_tx, body_rx) = mpsc::channel();
    let callback_thread = thread::spawn(move || {
        if let Ok(mut request) = callback_server.recv() {
            let mut body = String::new();
            request.as_reader().read_to_string(&mut body).unwrap();
            let _ = request.respond(Response::from_string("ok"));
            let _ = body_tx.send(body);
        }
    });

    let settings = Arc::new(Settings {
        port: 0,
        workers: 1,
        gpus: 1,
        queue_capacity: 4,
        input_dir: input_dir.path().to_path_buf(),
        output_dir: output_dir.path().to_path_buf(),
        stagger_ms: 0,
        no_gpu: true,
        batch: false,
        processed_ring_capacity: 16,
    });

    let queue = Arc::new(BoundedQueue::new(settings.queue_capacity));
    let processed = Arc::new(ProcessedSet::new(
        settings.output_dir.clone(),
        settings.processed_ring_capacity,
    ));
    let stats = Arc::new(Stats::new());
    let router = Router::new(queue.clone(), settings.clone());

    let (outcomes_tx, outcomes_rx) = crossbeam_channel::unbounded();
    let pool = WorkerPool::spawn(settings.clone(), queue.clone(), stats.clone(), outcomes_tx);
    let notifier_handle = notifier::spawn(outcomes_rx, processed.clone());

    let callback_url = format!("http://{callback_addr}");
    let metadata: Value = json!({"trace_id": "abc123"});
    let outcome = router.enqueue(input_file.to_str().unwrap(), Some(callback_url), Some(metadata));
    assert!(matches!(outcome, RouteOutcome::Queued { .. }));

    queue.close();
    pool.join_all();
    let _ = notifier_handle.join();
    let _ = callback_thread.join();

    let body = body_rx.recv_timeout(Duration::from_secs(5)).expect("callback never fired");
    let payload: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(payload["status"], "completed");
    assert_eq!(payload["frameCount"], 0);
    assert_eq!(payload["inputFile"], input_file.to_string_lossy().to_string());
    assert_eq!(payload["outputFile"], input_file.to_string_lossy().to_string());
    assert_eq!(payload["metadata"]["trace_id"], "abc123");

    let snap = stats.snapshot();
    assert_eq!(snap.processed, 1);
    assert_eq!(snap.failed, 0);
}
