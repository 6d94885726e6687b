//! Tagged error kinds shared by the gateway and coordinator, plus the
//! RPC-status-code-to-HTTP-status-code translation table at the edge.
//!
//! Follows the same `*Error<E>`-composition shape as
//! `tower_resilience_core::ResilienceError` — one enum per boundary, not a
//! loose set of functions — but tags *kinds* instead of wrapping an inner
//! application error, since at the gateway boundary there is no further
//! inner type to preserve.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Serialize;

/// Metadata key a coordinator RPC error sets to distinguish breaker-open and
/// deadline-before-any-result from `tonic::Code`'s coarser categories.
pub const ERROR_KIND_METADATA_KEY: &str = "x-search-error-kind";

/// Symbolic error kind, stable across the gateway's JSON error body and any
/// internal logging — never re-derived from the HTTP status alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ClientFault,
    AuthFault,
    RateLimited,
    NotFound,
    UpstreamBreakerOpen,
    UpstreamTimeout,
    UpstreamUnavailable,
    Internal,
}

impl ErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::ClientFault => StatusCode::BAD_REQUEST,
            ErrorKind::AuthFault => StatusCode::UNAUTHORIZED,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::UpstreamBreakerOpen => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::UpstreamTimeout => StatusCode::REQUEST_TIMEOUT,
            ErrorKind::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ClientFault => "client_fault",
            ErrorKind::AuthFault => "auth_fault",
            ErrorKind::RateLimited => "RATE_LIMIT_EXCEEDED",
            ErrorKind::NotFound => "not_found",
            ErrorKind::UpstreamBreakerOpen => "upstream_breaker_open",
            ErrorKind::UpstreamTimeout => "upstream_timeout",
            ErrorKind::UpstreamUnavailable => "upstream_unavailable",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
    request_id: String,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
    details: Option<String>,
}

/// The gateway's single error type. Handlers return
/// `Result<Json<SearchResponse>, GatewayError>` and let `IntoResponse`
/// produce the body shape `{"error": {code, message, details}, "request_id"}`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct GatewayError {
    pub kind: ErrorKind,
    pub message: String,
    pub request_id: String,
    pub details: Option<String>,
    /// Present only for `RateLimited`.
    pub retry_after_secs: Option<u64>,
}

impl GatewayError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            request_id: request_id.into(),
            details: None,
            retry_after_secs: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn rate_limited(request_id: impl Into<String>, retry_after_secs: u64) -> Self {
        Self {
            kind: ErrorKind::RateLimited,
            message: "rate limit exceeded".into(),
            request_id: request_id.into(),
            details: None,
            retry_after_secs: Some(retry_after_secs),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let status = self.kind.status();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.kind.as_str(),
                message: self.message,
                details: self.details,
            },
            request_id: self.request_id,
        };
        match self.retry_after_secs {
            Some(secs) => (
                status,
                [(axum::http::header::RETRY_AFTER, secs.to_string())],
                Json(body),
            )
                .into_response(),
            None => (status, Json(body)).into_response(),
        }
    }
}

/// RPC status code → HTTP status code, per the coordinator/gateway boundary
/// contract. Defaults to 500 for anything not explicitly listed (`Unknown`,
/// `DataLoss`, and any future `tonic::Code` variant).
pub fn rpc_to_http_status(code: tonic::Code) -> StatusCode {
    use tonic::Code;
    match code {
        Code::Ok => StatusCode::OK,
        Code::Cancelled => StatusCode::REQUEST_TIMEOUT,
        Code::InvalidArgument => StatusCode::BAD_REQUEST,
        Code::DeadlineExceeded => StatusCode::REQUEST_TIMEOUT,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists => StatusCode::CONFLICT,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        Code::FailedPrecondition => StatusCode::PRECONDITION_FAILED,
        Code::Aborted => StatusCode::CONFLICT,
        Code::OutOfRange => StatusCode::RANGE_NOT_SATISFIABLE,
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        Code::Internal | Code::DataLoss | Code::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `true` for RPC codes the caller should retry: DeadlineExceeded,
/// Unavailable, ResourceExhausted, Aborted.
pub fn is_retryable(code: tonic::Code) -> bool {
    matches!(
        code,
        tonic::Code::DeadlineExceeded
            | tonic::Code::Unavailable
            | tonic::Code::ResourceExhausted
            | tonic::Code::Aborted
    )
}

/// Translates a coordinator RPC failure into a [`GatewayError`], consulting
/// `status`'s metadata for the finer `UpstreamBreakerOpen`/`UpstreamTimeout`
/// distinction that `tonic::Code` alone collapses into `Unavailable`/
/// `DeadlineExceeded`.
pub fn to_gateway_error(status: &tonic::Status, request_id: impl Into<String>) -> GatewayError {
    let request_id = request_id.into();
    let message = status.message().to_string();

    let kind = match status
        .metadata()
        .get(ERROR_KIND_METADATA_KEY)
        .and_then(|v| v.to_str().ok())
    {
        Some("upstream_breaker_open") => ErrorKind::UpstreamBreakerOpen,
        Some("upstream_timeout") => ErrorKind::UpstreamTimeout,
        _ => match status.code() {
            tonic::Code::InvalidArgument => ErrorKind::ClientFault,
            tonic::Code::Unauthenticated => ErrorKind::AuthFault,
            tonic::Code::PermissionDenied => ErrorKind::AuthFault,
            tonic::Code::ResourceExhausted => ErrorKind::RateLimited,
            tonic::Code::NotFound => ErrorKind::NotFound,
            tonic::Code::DeadlineExceeded => ErrorKind::UpstreamTimeout,
            tonic::Code::Unavailable => ErrorKind::UpstreamUnavailable,
            _ => ErrorKind::Internal,
        },
    };

    GatewayError::new(kind, message, request_id)
}
