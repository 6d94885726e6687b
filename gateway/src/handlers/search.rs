//! `POST|GET /api/v1/search`.

use std::collections::HashMap;

use axum::extract::{Extension, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use search_errors::{to_gateway_error, GatewayError};
use search_types::SearchRequest;
use serde::Deserialize;

use crate::auth::AuthContext;
use crate::request_id::request_id_of_headers;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQueryParams {
    pub q: String,
    pub index: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

fn request_from_parts(
    query: String,
    index: String,
    limit: u32,
    offset: u32,
    request_id: String,
) -> SearchRequest {
    SearchRequest {
        query,
        index,
        limit,
        offset,
        engines: None,
        engine_overrides: HashMap::new(),
        filters: HashMap::new(),
        sort_field: None,
        sort_order: None,
        highlight: false,
        timeout_ms: None,
        request_id,
    }
}

pub async fn search_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    _auth: Extension<AuthContext>,
    Query(params): Query<SearchQueryParams>,
) -> Result<Json<search_types::SearchResponse>, GatewayError> {
    let request_id = request_id_of_headers(&headers);
    let domain_req = request_from_parts(
        params.q,
        params.index.unwrap_or_else(|| "docs".to_string()),
        params.limit.unwrap_or(10),
        params.offset.unwrap_or(0),
        request_id.clone(),
    );
    run_search(&state, domain_req, request_id).await
}

pub async fn search_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    _auth: Extension<AuthContext>,
    Json(mut domain_req): Json<SearchRequest>,
) -> Result<Json<search_types::SearchResponse>, GatewayError> {
    let request_id = request_id_of_headers(&headers);
    if domain_req.request_id.is_empty() {
        domain_req.request_id = request_id.clone();
    }
    run_search(&state, domain_req, request_id).await
}

async fn run_search(
    state: &AppState,
    domain_req: SearchRequest,
    request_id: String,
) -> Result<Json<search_types::SearchResponse>, GatewayError> {
    domain_req
        .validate()
        .map_err(|e| GatewayError::new(search_errors::ErrorKind::ClientFault, e.to_string(), request_id.clone()))?;

    let wire_req = coordinator::proto::SearchRequest::from(domain_req);
    let wire_resp = state.proxy.search(wire_req).await.map_err(|status| to_gateway_error(&status, request_id))?;
    Ok(Json(wire_resp.into()))
}
