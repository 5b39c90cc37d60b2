// crates/forgecast-daemon/src/scanner.rs
//
// Batch-mode ingestion (C5 adapter): one pass over the input directory,
// skipping names the processed-set already knows about, then returns. Unlike
// the HTTP adapter this isn't a long-lived thread — `--batch` runs the scan
// once and exits when the queue drains.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use forgecast_core::ProcessedSet;

use crate::router::{RouteOutcome, Router};

/// Returns the number of jobs queued this pass.
pub fn scan_once(router: &Router, processed: &ProcessedSet, input_dir: &Path) -> usize {
    let entries = match fs::read_dir(input_dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %input_dir.display(), error = %err, "failed to read input directory");
            return 0;
        }
    };

    let mut queued = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };

        if processed.contains(&name) {
            continue;
        }

        match router.enqueue(&name, None, None) {
            RouteOutcome::Queued { queue_depth } => {
                info!(input = %name, queue_depth, "batch job queued");
                queued += 1;
            }
            RouteOutcome::QueueFull => {
                warn!(input = %name, "queue full during batch scan, stopping early");
                break;
            }
            // Raced with something removing the file between readdir and enqueue.
            RouteOutcome::NotFound => {}
        }
    }

    queued
}
