// crates/forgecast-daemon/src/main.rs
//
// Lifecycle controller (C8). Parses CLI flags into a resolved Settings, then
// runs startup -> serve -> shutdown in that order. Same clap::Parser +
// tracing_subscriber wiring masterselects-helper's main.rs uses for its own
// codec helper, generalized from a WebSocket server to this daemon's
// HTTP/batch ingestion plus worker pool.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::unbounded;
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use forgecast_core::{BoundedQueue, ProcessedSet, Settings, Stats};
use forgecast_daemon::{notifier, scanner, HttpServer, Router};
use forgecast_pipeline::{hardware_codecs_available, WorkerPool};

#[derive(Parser, Debug)]
#[command(name = "forgecast")]
#[command(about = "GPU-accelerated media transcoding daemon")]
#[command(version)]
struct Args {
    /// HTTP listen port (daemon mode)
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Worker pool size
    #[arg(long, default_value_t = 14)]
    workers: u32,

    /// GPU device count
    #[arg(long, default_value_t = 2)]
    gpus: u32,

    /// Bounded queue capacity
    #[arg(long = "queue-capacity", default_value_t = 2000)]
    queue_capacity: usize,

    /// Batch-mode scan root / base for relative paths
    #[arg(long = "input-dir", default_value = "./input")]
    input_dir: PathBuf,

    /// Transcoded segment destination
    #[arg(long = "output-dir", default_value = "./output")]
    output_dir: PathBuf,

    /// Inter-worker spawn delay, milliseconds
    #[arg(long = "stagger-ms", default_value_t = 50)]
    stagger_ms: u64,

    /// Diagnostic mode: acknowledge jobs without transcoding
    #[arg(long = "no-gpu")]
    no_gpu: bool,

    /// Scanner mode instead of HTTP daemon
    #[arg(long)]
    batch: bool,

    /// error|warn|info|debug|trace, overridable by RUST_LOG
    #[arg(long = "log-level", default_value = "info")]
    log_level: String,
}

const PROCESSED_RING_CAPACITY: usize = 2000;
const STATS_REPORT_INTERVAL: Duration = Duration::from_secs(5);

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    if !args.no_gpu && !hardware_codecs_available() {
        error!("hardware H.264 codecs unavailable, refusing to start (no software fallback)");
        return ExitCode::FAILURE;
    }

    let settings = Arc::new(Settings {
        port: args.port,
        workers: args.workers,
        gpus: args.gpus,
        queue_capacity: args.queue_capacity,
        input_dir: args.input_dir,
        output_dir: args.output_dir,
        stagger_ms: args.stagger_ms,
        no_gpu: args.no_gpu,
        batch: args.batch,
        processed_ring_capacity: PROCESSED_RING_CAPACITY,
    });

    if let Err(err) = std::fs::create_dir_all(&settings.output_dir) {
        error!(dir = %settings.output_dir.display(), error = %err, "failed to create output directory");
        return ExitCode::FAILURE;
    }

    let queue = Arc::new(BoundedQueue::new(settings.queue_capacity));
    let processed = Arc::new(ProcessedSet::new(
        settings.output_dir.clone(),
        settings.processed_ring_capacity,
    ));
    let stats = Arc::new(Stats::new());
    let router = Arc::new(Router::new(queue.clone(), settings.clone()));
    let shutdown = Arc::new(AtomicBool::new(false));

    if let Err(err) = signal_hook::flag::register(SIGINT, shutdown.clone()) {
        error!(error = %err, "failed to register SIGINT handler");
        return ExitCode::FAILURE;
    }
    if let Err(err) = signal_hook::flag::register(SIGTERM, shutdown.clone()) {
        error!(error = %err, "failed to register SIGTERM handler");
        return ExitCode::FAILURE;
    }

    let stats_reporter = spawn_stats_reporter(stats.clone(), queue.clone(), shutdown.clone());

    let (outcomes_tx, outcomes_rx) = unbounded();
    let pool = WorkerPool::spawn(settings.clone(), queue.clone(), stats.clone(), outcomes_tx);
    let notifier_handle = notifier::spawn(outcomes_rx, processed.clone());

    info!(
        workers = settings.workers,
        gpus = settings.gpus,
        port = settings.port,
        batch = settings.batch,
        no_gpu = settings.no_gpu,
        "forgecast started"
    );

    if settings.batch {
        let queued = scanner::scan_once(&router, &processed, &settings.input_dir);
        info!(queued, "batch scan complete, draining queue");
        queue.close();
    } else {
        match HttpServer::bind(settings.port) {
            Ok(http_server) => {
                http_server.serve(
                    router.clone(),
                    queue.clone(),
                    stats.clone(),
                    settings.clone(),
                    shutdown.clone(),
                );
                info!("shutdown signal observed, stopping ingestion");
                queue.close();
            }
            Err(err) => {
                error!(error = %err, "failed to bind http listener");
                queue.close();
                pool.join_all();
                let _ = notifier_handle.join();
                return ExitCode::FAILURE;
            }
        }
    }

    pool.join_all();
    let _ = notifier_handle.join();
    shutdown.store(true, Ordering::Release);
    let _ = stats_reporter.join();

    let snap = stats.snapshot();
    info!(
        processed = snap.processed,
        failed = snap.failed,
        uptime_seconds = snap.uptime_seconds,
        "forgecast stopped"
    );

    ExitCode::SUCCESS
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Prints a one-line summary every 5 seconds with a rolling files/sec rate,
/// through the structured logging stack rather than raw stdout.
fn spawn_stats_reporter(
    stats: Arc<Stats>,
    queue: Arc<BoundedQueue>,
    shutdown: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("stats-reporter".into())
        .spawn(move || {
            let mut last_completed: u64 = 0;
            while !shutdown.load(Ordering::Acquire) {
                std::thread::sleep(STATS_REPORT_INTERVAL);
                let snap = stats.snapshot();
                let completed = snap.processed + snap.failed;
                let rate =
                    completed.saturating_sub(last_completed) as f64 / STATS_REPORT_INTERVAL.as_secs_f64();
                last_completed = completed;
                info!(
                    processed = snap.processed,
                    failed = snap.failed,
                    queue_depth = queue.depth(),
                    files_per_sec = rate,
                    uptime_seconds = snap.uptime_seconds,
                    "stats summary"
                );
            }
        })
        .expect("failed to spawn stats reporter thread")
}
