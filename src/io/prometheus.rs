//! Prometheus metrics HTTP endpoint
//!
//! Exposes monitor metrics in Prometheus text format at /metrics.
//! Uses hyper for the HTTP server; scrapes read a non-resetting snapshot
//! so they never disturb the periodic log summary.

use crate::infra::metrics::{Metrics, MetricsSnapshot};
use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::fmt::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

/// Write one metric with the site label
fn write_metric(
    output: &mut String,
    name: &str,
    help: &str,
    typ: MetricType,
    site: &str,
    val: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {}", typ.as_str());
    let _ = writeln!(output, "{name}{{site=\"{site}\"}} {val}");
}

/// Format the snapshot in Prometheus text exposition format
fn format_prometheus_metrics(snap: &MetricsSnapshot, site: &str) -> String {
    use MetricType::{Counter, Gauge};

    let mut output = String::with_capacity(2048);
    write_metric(
        &mut output,
        "parkwatch_samples_total",
        "Sensor samples taken",
        Counter,
        site,
        snap.samples_total,
    );
    write_metric(
        &mut output,
        "parkwatch_changes_total",
        "Debounced sensor changes detected",
        Counter,
        site,
        snap.changes_total,
    );
    write_metric(
        &mut output,
        "parkwatch_report_attempts_total",
        "Report attempts reaching the transport",
        Counter,
        site,
        snap.attempts_total,
    );
    write_metric(
        &mut output,
        "parkwatch_reports_accepted_total",
        "Reports confirmed by the server",
        Counter,
        site,
        snap.accepted_total,
    );
    write_metric(
        &mut output,
        "parkwatch_reports_rejected_total",
        "Reports answered but rejected or rate-limited",
        Counter,
        site,
        snap.rejected_total,
    );
    write_metric(
        &mut output,
        "parkwatch_transport_errors_total",
        "Report attempts with no HTTP answer",
        Counter,
        site,
        snap.transport_errors_total,
    );
    write_metric(
        &mut output,
        "parkwatch_last_entry_id",
        "Entry id of the last accepted report",
        Gauge,
        site,
        snap.last_entry_id,
    );
    write_metric(
        &mut output,
        "parkwatch_free_slots_zone_a",
        "Currently free slots in zone A",
        Gauge,
        site,
        snap.free_a,
    );
    write_metric(
        &mut output,
        "parkwatch_free_slots_zone_b",
        "Currently free slots in zone B",
        Gauge,
        site,
        snap.free_b,
    );
    write_metric(
        &mut output,
        "parkwatch_pending_change",
        "Whether a change awaits a confirmed report",
        Gauge,
        site,
        snap.pending_change,
    );
    output
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    metrics: Arc<Metrics>,
    site_id: String,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let body = format_prometheus_metrics(&metrics.snapshot(), &site_id);
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "text/plain; version=0.0.4; charset=utf-8")
                .body(Full::new(Bytes::from(body)))
                .expect("static response should not fail"))
        }
        (&Method::GET, "/health") => Ok(Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::from("ok")))
            .expect("static response should not fail")),
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("Not Found")))
            .expect("static response should not fail")),
    }
}

/// Run the metrics HTTP server until shutdown is signaled
pub async fn start_metrics_server(
    port: u16,
    metrics: Arc<Metrics>,
    site_id: String,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(port = port, "metrics_server_started");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, _) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!(error = %e, "metrics_accept_error");
                        continue;
                    }
                };

                let metrics = metrics.clone();
                let site_id = site_id.clone();
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service = service_fn(move |req| {
                        handle_request(req, metrics.clone(), site_id.clone())
                    });
                    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                        error!(error = %e, "metrics_connection_error");
                    }
                });
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("metrics_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_includes_all_series() {
        let metrics = Metrics::new();
        metrics.record_sample();
        metrics.record_attempt(100);
        metrics.record_accepted(17);
        metrics.set_occupancy(2, 4);

        let output = format_prometheus_metrics(&metrics.snapshot(), "lot-test");
        assert!(output.contains("parkwatch_samples_total{site=\"lot-test\"} 1"));
        assert!(output.contains("parkwatch_report_attempts_total{site=\"lot-test\"} 1"));
        assert!(output.contains("parkwatch_reports_accepted_total{site=\"lot-test\"} 1"));
        assert!(output.contains("parkwatch_last_entry_id{site=\"lot-test\"} 17"));
        assert!(output.contains("parkwatch_free_slots_zone_a{site=\"lot-test\"} 2"));
        assert!(output.contains("parkwatch_free_slots_zone_b{site=\"lot-test\"} 4"));
        assert!(output.contains("# TYPE parkwatch_samples_total counter"));
        assert!(output.contains("# TYPE parkwatch_pending_change gauge"));
    }
}
