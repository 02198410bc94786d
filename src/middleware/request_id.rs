//! Assigns a correlation id to every request: one JSON log line per
//! request carries it, and the response echoes it back as `X-Request-ID`.
//! Uses the same `from_fn_with_state`-style function-middleware
//! composition as the auth layer, but stateless.

use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Debug, Clone)]
pub struct RequestId(pub String);

pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
    }

    if response.status().is_client_error() || response.status().is_server_error() {
        response = stamp_error_body(response, &id).await;
    }

    response
}

/// Error bodies carry the request id inline, not just in the header — a
/// client reporting a failure by pasting the JSON body alone still gives
/// support a traceable id.
async fn stamp_error_body(response: Response, id: &str) -> Response {
    let (parts, body) = response.into_parts();
    let Ok(bytes) = to_bytes(body, 64 * 1024).await else {
        return Response::from_parts(parts, Body::empty());
    };

    let stamped = serde_json::from_slice::<serde_json::Value>(&bytes).ok().and_then(|mut value| {
        value.as_object_mut().map(|obj| {
            obj.insert("request_id".to_string(), serde_json::Value::String(id.to_string()));
            value.clone()
        })
    });

    match stamped {
        Some(value) => {
            let bytes = serde_json::to_vec(&value).unwrap_or_default();
            Response::from_parts(parts, Body::from(bytes))
        },
        None => Response::from_parts(parts, Body::from(bytes)),
    }
}
