//! `X-Request-ID` generation and propagation.
//!
//! Every request echoes an `X-Request-ID` in the response, generated when
//! the client didn't supply one. Built on `tower_http`'s
//! `SetRequestIdLayer`/`PropagateRequestIdLayer` pair rather than a hand
//! rolled header-copying middleware — the same request-id idiom named in
//! the spec's HTTP surface section.

use axum::http::{HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Clone, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let value = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
        Some(RequestId::new(value))
    }
}

/// Reads the request id a handler should echo in error bodies and logs.
/// Falls back to `"unknown"` only if the request-id layer was somehow
/// bypassed — in the wired app it never is.
pub fn request_id_of<B>(req: &Request<B>) -> String {
    request_id_of_headers(req.headers())
}

/// Same lookup, for handlers that extract `HeaderMap` instead of the whole
/// `Request` (so it composes with a body extractor like `Json<T>`, which
/// must be the last argument).
pub fn request_id_of_headers(headers: &axum::http::HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
