//! Minimal bearer-token `AuthLayer`: checks `Authorization: Bearer <token>`
//! against a configured static token set. Real identity-provider
//! integration is out of scope (see `Config::auth`'s docs) — this exists so
//! the HTTP surface's `Auth: required` rows actually reject unauthenticated
//! traffic rather than being a documentation-only column.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use search_errors::{ErrorKind, GatewayError};

use crate::request_id::request_id_of;

/// The outcome of bearer-token verification, attached to the request as an
/// extension so handlers can read the caller's subject without re-parsing
/// the header.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub subject: String,
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers().get(AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ")
}

/// Rejects requests with a missing or unrecognized bearer token before they
/// reach any handler. Tokens map 1:1 to an opaque subject name (the token
/// itself, since no identity provider is wired up) for the `AuthContext`.
pub async fn require_bearer_token(
    State(tokens): State<Arc<Vec<String>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let request_id = request_id_of(&req);

    let token = match bearer_token(&req) {
        Some(t) => t,
        None => {
            return Err(GatewayError::new(
                ErrorKind::AuthFault,
                "missing bearer token",
                request_id,
            ))
        }
    };

    if !tokens.iter().any(|t| t == token) {
        return Err(GatewayError::new(ErrorKind::AuthFault, "invalid bearer token", request_id));
    }

    req.extensions_mut().insert(AuthContext { subject: token.to_string() });
    Ok(next.run(req).await)
}
