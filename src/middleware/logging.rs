//! Logging middleware
//!
//! Logs every HTTP request with its method, path, status and latency.

use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{info, info_span, warn, Instrument};

/// Requests slower than this are logged at warn level
const SLOW_REQUEST_THRESHOLD: Duration = Duration::from_secs(1);

/// Request logger, used with `axum::middleware::from_fn`
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let span = info_span!("http_request", method = %method, path = %path);

    async move {
        let started = Instant::now();
        let response = next.run(request).await;
        let elapsed = started.elapsed();
        log_response(response.status(), elapsed);
        response
    }
    .instrument(span)
    .await
}

fn log_response(status: StatusCode, elapsed: Duration) {
    let duration_ms = elapsed.as_millis() as u64;

    if status.is_server_error() {
        warn!(status = status.as_u16(), duration_ms, "Request failed");
    } else {
        info!(status = status.as_u16(), duration_ms, "Request completed");
    }

    if elapsed > SLOW_REQUEST_THRESHOLD {
        warn!(duration_ms, "Slow request detected");
    }
}
