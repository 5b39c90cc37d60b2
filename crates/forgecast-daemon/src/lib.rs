// crates/forgecast-daemon/src/lib.rs
//
// Library half of the daemon binary: the HTTP/batch ingestion adapters, the
// shared router contract, and the completion notifier. Split out from
// main.rs so the no-GPU end-to-end path (router -> queue -> worker ->
// notifier) can be driven from an integration test without a subprocess.

pub mod http;
pub mod notifier;
pub mod router;
pub mod scanner;

pub use http::HttpServer;
pub use router::{RouteOutcome, Router};
