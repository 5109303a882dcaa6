use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

const REQUEST_ID: &str = "x-request-id";

/// Preserves an incoming `x-request-id` or assigns one, and echoes it back.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let req_id_value = req
        .headers()
        .get(REQUEST_ID)
        .cloned()
        .or_else(|| HeaderValue::from_str(&Uuid::new_v4().to_string()).ok());

    // Downstream spans read it from the extensions
    if let Some(value) = &req_id_value {
        req.extensions_mut().insert(value.clone());
    }

    let mut res = next.run(req).await;

    if let Some(value) = req_id_value {
        res.headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID), value);
    }
    res
}

/// Counts requests and records their latency.
pub async fn track_metrics(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let started = Instant::now();

    let res = next.run(req).await;

    crate::metrics::record_http_request(method.as_str(), res.status().as_u16(), started.elapsed());
    res
}
