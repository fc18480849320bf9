//! Mock telemetry update endpoint
//!
//! Simulates the ThingSpeak `/update` endpoint for local testing.
//!
//! Behavior:
//! 1. Listens on a configurable port (default 8080)
//! 2. Answers each GET /update with an incrementing entry id as plain text
//! 3. `--reject-every N` answers every Nth request with body `0`
//!    (the server-side rate-limit signal)
//! 4. `--fail-every N` answers every Nth request with HTTP 500
//!
//! Usage:
//!   cargo run --bin mock_thingspeak -- --port 8080 --reject-every 3

use bytes::Bytes;
use clap::Parser;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mock_thingspeak")]
#[command(about = "Mock telemetry update endpoint for local simulation")]
struct Args {
    /// TCP port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Answer every Nth request with entry id 0 (0 = never)
    #[arg(long, default_value = "0")]
    reject_every: u64,

    /// Answer every Nth request with HTTP 500 (0 = never)
    #[arg(long, default_value = "0")]
    fail_every: u64,
}

struct MockState {
    reject_every: u64,
    fail_every: u64,
    requests: AtomicU64,
    next_entry: AtomicU64,
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<MockState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    if req.method() != Method::GET || req.uri().path() != "/update" {
        return Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("Not Found")))
            .expect("static response should not fail"));
    }

    let n = state.requests.fetch_add(1, Ordering::Relaxed) + 1;
    let query = req.uri().query().unwrap_or("");

    if state.fail_every > 0 && n % state.fail_every == 0 {
        warn!(request = n, query = %query, "mock_forced_failure");
        return Ok(Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Full::new(Bytes::from("0")))
            .expect("static response should not fail"));
    }

    if state.reject_every > 0 && n % state.reject_every == 0 {
        warn!(request = n, query = %query, "mock_forced_rejection");
        return Ok(Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::from("0")))
            .expect("static response should not fail"));
    }

    let entry_id = state.next_entry.fetch_add(1, Ordering::Relaxed) + 1;
    info!(request = n, entry_id = entry_id, query = %query, "mock_update_stored");

    Ok(Response::builder()
        .status(StatusCode::OK)
        .body(Full::new(Bytes::from(entry_id.to_string())))
        .expect("static response should not fail"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();
    let state = Arc::new(MockState {
        reject_every: args.reject_every,
        fail_every: args.fail_every,
        requests: AtomicU64::new(0),
        next_entry: AtomicU64::new(0),
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    let listener = TcpListener::bind(addr).await?;
    info!(
        port = args.port,
        reject_every = args.reject_every,
        fail_every = args.fail_every,
        "mock_thingspeak_listening"
    );

    loop {
        let (stream, _) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| handle_request(req, state.clone()));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                warn!(error = %e, "mock_connection_error");
            }
        });
    }
}
