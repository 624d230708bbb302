use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;

pub static REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Middleware: tags every request with an `x-request-id` (reusing the caller's
/// if it sent one), runs the request inside a span carrying it and echoes it
/// back. Responses carry tokens, so they are also marked `no-store`.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let req_id = req
        .headers()
        .get(&REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(str::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let value = HeaderValue::from_str(&req_id).ok();
    if let Some(v) = &value {
        req.headers_mut().insert(REQUEST_ID.clone(), v.clone());
    }

    let span = tracing::info_span!("request", request_id = %req_id);
    let mut resp = next.run(req).instrument(span).await;
    let headers = resp.headers_mut();
    if let Some(v) = value {
        headers.insert(REQUEST_ID.clone(), v);
    }
    headers.insert("cache-control", HeaderValue::from_static("no-store"));
    resp
}
