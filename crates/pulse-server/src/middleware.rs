//! Request middleware for the read API: correlation ids and a per-client
//! request budget.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_REQUEST_ID_LEN: usize = 64;

/// Once this many clients are tracked, stale buckets are pruned on the next
/// admission.
const MAX_TRACKED_CLIENTS: usize = 1024;

/// Correlation id carried through request extensions and echoed on the
/// response, so a dashboard request can be matched to its server log lines.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Accept a caller-supplied id only when it is short printable ASCII.
/// Anything else is replaced so log lines stay greppable.
fn incoming_request_id(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?;
    if value.is_empty() || value.len() > MAX_REQUEST_ID_LEN {
        return None;
    }
    if !value.bytes().all(|b| b.is_ascii_graphic()) {
        return None;
    }
    Some(value.to_string())
}

/// Attach a [`RequestId`] to the request and echo it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = incoming_request_id(req.headers()).unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

struct Bucket {
    window_start: Instant,
    count: usize,
}

/// Per-client request budget over a fixed window.
///
/// Clients are told apart by the first `x-forwarded-for` hop; direct
/// connections share one bucket. Sized from `PULSE_API_REQUESTS_PER_MINUTE`
/// at startup.
#[derive(Clone)]
pub struct ApiRateLimit {
    per_window: usize,
    window: Duration,
    buckets: Arc<Mutex<HashMap<String, Bucket>>>,
}

impl ApiRateLimit {
    #[must_use]
    pub fn per_minute(per_window: usize) -> Self {
        Self::new(per_window, Duration::from_secs(60))
    }

    #[must_use]
    pub fn new(per_window: usize, window: Duration) -> Self {
        Self {
            per_window,
            window,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Admit one request for `client`, or return how long until the client's
    /// window resets.
    async fn try_admit(&self, client: &str) -> Result<(), Duration> {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();

        if buckets.len() >= MAX_TRACKED_CLIENTS {
            buckets.retain(|_, b| now.duration_since(b.window_start) < self.window);
        }

        let bucket = buckets.entry(client.to_string()).or_insert(Bucket {
            window_start: now,
            count: 0,
        });
        if now.duration_since(bucket.window_start) >= self.window {
            bucket.window_start = now;
            bucket.count = 0;
        }

        if bucket.count >= self.per_window {
            let elapsed = now.duration_since(bucket.window_start);
            return Err(self.window.saturating_sub(elapsed));
        }
        bucket.count += 1;
        Ok(())
    }
}

fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(|| "direct".to_string(), ToString::to_string)
}

#[derive(Debug, Serialize)]
struct RateLimitBody {
    error: RateLimitError,
}

#[derive(Debug, Serialize)]
struct RateLimitError {
    code: &'static str,
    message: &'static str,
}

/// Reject requests past the client's budget with 429 and a `Retry-After`.
pub async fn enforce_rate_limit(
    State(limit): State<ApiRateLimit>,
    req: Request,
    next: Next,
) -> Response {
    let client = client_key(req.headers());
    match limit.try_admit(&client).await {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            tracing::warn!(client = %client, "api request budget exhausted");
            let mut res = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(RateLimitBody {
                    error: RateLimitError {
                        code: "rate_limited",
                        message: "rate limit exceeded",
                    },
                }),
            )
                .into_response();
            let secs = retry_after.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                res.headers_mut().insert(header::RETRY_AFTER, value);
            }
            res
        }
    }
}
