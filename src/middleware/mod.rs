pub mod auth;
pub mod metrics;
pub mod request_id;

pub use auth::{auth_middleware, AuthUser};
pub use metrics::metrics_middleware;
pub use request_id::{request_id_middleware, RequestId, REQUEST_ID_HEADER};

use axum::http::HeaderMap;

/// Best-effort client IP extraction for rate-limit/quota keys and request
/// logs. Checked in the order a reverse proxy would set them; falls back
/// to a constant when nothing is present (local/dev requests).
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let trimmed = first.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real_ip.to_string();
    }
    "unknown".to_string()
}
