//! Per-request access log.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, info, warn};

/// Probe endpoints hit every few seconds; logged at debug only.
const PROBE_PATHS: [&str; 2] = ["/healthz", "/readyz"];

/// Logs method, path, status, and latency once the response is ready.
///
/// Server errors are logged at warn so they surface without enabling debug
/// output; the handler that produced them has already logged the cause.
pub async fn request_logging(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if status.is_server_error() {
        warn!(%method, %path, status = status.as_u16(), elapsed_ms, "request failed");
    } else if PROBE_PATHS.contains(&path.as_str()) {
        debug!(%method, %path, status = status.as_u16(), elapsed_ms, "probe");
    } else {
        info!(%method, %path, status = status.as_u16(), elapsed_ms, "request");
    }

    response
}
