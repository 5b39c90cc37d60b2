// crates/forgecast-daemon/src/http.rs
//
// Thread-per-connection HTTP control plane (C5 adapter). Any HTTP server
// implementation satisfies the request/response contract below; this one is
// tiny_http's blocking accept loop with a short recv_timeout so shutdown can
// be observed without a dedicated "unblock" call.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{info, warn};

use forgecast_core::{BoundedQueue, Settings, Stats};

use crate::router::{RouteOutcome, Router};

const ACCEPT_POLL: Duration = Duration::from_millis(200);

#[derive(Deserialize)]
struct EnqueueRequest {
    #[serde(rename = "inputPath")]
    input_path: String,
    #[serde(rename = "callbackUrl")]
    callback_url: Option<String>,
    metadata: Option<Value>,
}

pub struct HttpServer {
    server: Server,
}

impl HttpServer {
    pub fn bind(port: u16) -> anyhow::Result<Self> {
        let server = Server::http(("0.0.0.0", port))
            .map_err(|e| anyhow::anyhow!("failed to bind http listener on port {port}: {e}"))?;
        Ok(Self { server })
    }

    /// Accepts connections, spawning one handler thread per request, until
    /// `shutdown` is set. Returns once the accept loop has observed it.
    pub fn serve(
        &self,
        router: Arc<Router>,
        queue: Arc<BoundedQueue>,
        stats: Arc<Stats>,
        settings: Arc<Settings>,
        shutdown: Arc<AtomicBool>,
    ) {
        while !shutdown.load(Ordering::Acquire) {
            match self.server.recv_timeout(ACCEPT_POLL) {
                Ok(Some(request)) => {
                    let router = router.clone();
                    let queue = queue.clone();
                    let stats = stats.clone();
                    let settings = settings.clone();
                    thread::spawn(move || handle_request(request, &router, &queue, &stats, &settings));
                }
                Ok(None) => continue,
                Err(err) => {
                    warn!(error = %err, "http accept error");
                    break;
                }
            }
        }
    }
}

fn handle_request(
    mut request: Request,
    router: &Router,
    queue: &BoundedQueue,
    stats: &Stats,
    settings: &Settings,
) {
    match (request.method(), request.url()) {
        (Method::Post, "/enqueue") => handle_enqueue(request, router, queue, settings),
        (Method::Get, "/health") => handle_health(request, stats, queue, settings),
        (Method::Get, "/metrics") => handle_metrics(request, stats, queue, settings),
        _ => respond_json(
            request,
            404,
            json!({
                "error": "Not found",
                "available_endpoints": ["/enqueue", "/health", "/metrics"],
            }),
        ),
    }
}

fn handle_enqueue(mut request: Request, router: &Router, queue: &BoundedQueue, settings: &Settings) {
    let mut body = String::new();
    if request.as_reader().read_to_string(&mut body).is_err() {
        respond_json(request, 400, json!({"error": "Invalid JSON"}));
        return;
    }

    let enqueue_req: EnqueueRequest = match serde_json::from_str(&body) {
        Ok(req) => req,
        Err(_) => {
            respond_json(request, 400, json!({"error": "Invalid JSON"}));
            return;
        }
    };

    match router.enqueue(&enqueue_req.input_path, enqueue_req.callback_url, enqueue_req.metadata) {
        RouteOutcome::Queued { queue_depth } => {
            info!(input = %enqueue_req.input_path, queue_depth, "job queued");
            respond_json(
                request,
                200,
                json!({
                    "status": "queued",
                    "inputPath": enqueue_req.input_path,
                    "queue_depth": queue_depth,
                }),
            );
        }
        RouteOutcome::NotFound => respond_json(
            request,
            404,
            json!({
                "error": "File not found",
                "inputPath": enqueue_req.input_path,
            }),
        ),
        RouteOutcome::QueueFull => respond_json(
            request,
            503,
            json!({
                "error": "Queue almost full",
                "queue_depth": queue.depth(),
                "queue_capacity": settings.queue_capacity,
                "retry_after": "60",
            }),
        ),
    }
}

fn handle_health(request: Request, stats: &Stats, queue: &BoundedQueue, settings: &Settings) {
    let snap = stats.snapshot();
    respond_json(
        request,
        200,
        json!({
            "status": "healthy",
            "processed": snap.processed,
            "failed": snap.failed,
            "queue_depth": queue.depth(),
            "workers": settings.workers,
            "uptime_seconds": snap.uptime_seconds,
        }),
    );
}

fn handle_metrics(request: Request, stats: &Stats, queue: &BoundedQueue, settings: &Settings) {
    let snap = stats.snapshot();
    let body = format!(
        "# HELP transcoder_processed_total Segments transcoded successfully.\n\
         # TYPE transcoder_processed_total counter\n\
         transcoder_processed_total {}\n\
         # HELP transcoder_failed_total Segments that failed to transcode.\n\
         # TYPE transcoder_failed_total counter\n\
         transcoder_failed_total {}\n\
         # HELP transcoder_uptime_seconds Seconds since process start.\n\
         # TYPE transcoder_uptime_seconds counter\n\
         transcoder_uptime_seconds {}\n\
         # HELP transcoder_queue_depth Jobs currently queued.\n\
         # TYPE transcoder_queue_depth gauge\n\
         transcoder_queue_depth {}\n\
         # HELP transcoder_workers Configured worker pool size.\n\
         # TYPE transcoder_workers gauge\n\
         transcoder_workers {}\n",
        snap.processed, snap.failed, snap.uptime_seconds, queue.depth(), settings.workers,
    );

    let response = Response::from_string(body)
        .with_header(content_type_header("text/plain; version=0.0.4"))
        .with_header(cors_header());
    if let Err(err) = request.respond(response) {
        warn!(error = %err, "failed to write http response");
    }
}

fn respond_json(request: Request, status: u16, body: Value) {
    let response = Response::from_string(body.to_string())
        .with_status_code(status)
        .with_header(content_type_header("application/json"))
        .with_header(cors_header());
    if let Err(err) = request.respond(response) {
        warn!(error = %err, "failed to write http response");
    }
}

fn content_type_header(value: &str) -> Header {
    Header::from_bytes(&b"Content-Type"[..], value.as_bytes()).expect("valid content-type header")
}

fn cors_header() -> Header {
    Header::from_bytes(&b"Access-Control-Allow-Origin"[..], &b"*"[..]).expect("valid cors header")
}
