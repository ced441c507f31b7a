//! Per-request trace ids and access logging.
//!
//! Small JSON bodies are logged at debug level, except on the settings
//! routes where they would carry the API key.

use crate::state::AppState;
use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

/// Bodies larger than this are never logged.
const MAX_LOGGED_BODY: usize = 1024;

/// Largest request body buffered here; matches axum's default extractor limit.
pub const MAX_BUFFERED_BODY: usize = 2 * 1024 * 1024;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Paths whose bodies may contain secrets.
fn is_redacted(path: &str) -> bool {
    path.starts_with("/api/settings") || path.starts_with("/settings")
}

pub async fn trace_middleware(
    State(_state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let redacted = is_redacted(&path);

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %method,
        path = %path,
    );

    async move {
        debug!("→ request started");
        let header_value = HeaderValue::from_str(&trace_id.to_string()).ok();

        let (parts, body) = req.into_parts();
        let buffered =
            buffer_and_log("request", redacted, &parts.headers, body, MAX_BUFFERED_BODY).await;
        let req_bytes = match buffered {
            Ok(bytes) => bytes,
            Err(e) => {
                let status = if e.is::<LengthLimitError>() {
                    StatusCode::PAYLOAD_TOO_LARGE
                } else {
                    StatusCode::BAD_REQUEST
                };
                warn!(error = %e, status = status.as_u16(), "failed to read request body");
                return status.into_response();
            }
        };
        let mut req = Request::from_parts(parts, Body::from(req_bytes));
        if let Some(v) = header_value.clone() {
            req.headers_mut().insert(X_TRACE_ID, v);
        }

        let response = next.run(req).await;

        let (parts, body) = response.into_parts();
        let buffered = buffer_and_log("response", redacted, &parts.headers, body, usize::MAX).await;
        let res_bytes = match buffered {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "failed to read response body");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };
        let mut response = Response::from_parts(parts, Body::from(res_bytes));
        if let Some(v) = header_value {
            response.headers_mut().insert(X_TRACE_ID, v);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "← response finished"
        );

        response
    }
    .instrument(span)
    .await
}

/// Collect at most `limit` bytes of `body`, logging it when it is small JSON
/// and not redacted.
async fn buffer_and_log(
    direction: &str,
    redacted: bool,
    headers: &header::HeaderMap,
    body: Body,
    limit: usize,
) -> Result<Bytes, BoxError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let is_json = content_type.contains("application/json");

    let bytes = Limited::new(body, limit)
        .collect()
        .await?
        .to_bytes();

    if bytes.is_empty() {
        return Ok(bytes);
    }
    if redacted {
        debug!("{direction} body: [redacted, size={}]", bytes.len());
    } else if is_json && bytes.len() < MAX_LOGGED_BODY {
        if let Ok(text) = std::str::from_utf8(&bytes) {
            debug!("{direction} body: {text}");
        }
    } else {
        debug!("{direction} body: [skipped, type={content_type}, size={}]", bytes.len());
    }

    Ok(bytes)
}
