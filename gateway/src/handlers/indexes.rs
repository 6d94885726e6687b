//! `/api/v1/indexes[/{id}[/rebuild]]`.

use axum::extract::{Extension, Path, State};
use axum::http::HeaderMap;
use axum::Json;
use coordinator::proto::{IndexRequest, ListIndexesRequest};
use search_errors::{to_gateway_error, GatewayError};
use serde::Serialize;

use crate::auth::AuthContext;
use crate::request_id::request_id_of_headers;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct IndexBody {
    pub index: String,
}

#[derive(Debug, Serialize)]
pub struct IndexListBody {
    pub indexes: Vec<String>,
}

pub async fn create_index(
    State(state): State<AppState>,
    headers: HeaderMap,
    _auth: Extension<AuthContext>,
    Path(index): Path<String>,
) -> Result<Json<IndexBody>, GatewayError> {
    let request_id = request_id_of_headers(&headers);
    let reply = state
        .proxy
        .create_index(IndexRequest { index })
        .await
        .map_err(|status| to_gateway_error(&status, request_id))?;
    Ok(Json(IndexBody { index: reply.index }))
}

pub async fn list_indexes(
    State(state): State<AppState>,
    headers: HeaderMap,
    _auth: Extension<AuthContext>,
) -> Result<Json<IndexListBody>, GatewayError> {
    let request_id = request_id_of_headers(&headers);
    let reply = state
        .proxy
        .list_indexes(ListIndexesRequest {})
        .await
        .map_err(|status| to_gateway_error(&status, request_id))?;
    Ok(Json(IndexListBody { indexes: reply.indexes }))
}

pub async fn get_index(
    State(state): State<AppState>,
    headers: HeaderMap,
    _auth: Extension<AuthContext>,
    Path(index): Path<String>,
) -> Result<Json<IndexBody>, GatewayError> {
    let request_id = request_id_of_headers(&headers);
    let reply = state
        .proxy
        .get_index(IndexRequest { index })
        .await
        .map_err(|status| to_gateway_error(&status, request_id))?;
    Ok(Json(IndexBody { index: reply.index }))
}

pub async fn delete_index(
    State(state): State<AppState>,
    headers: HeaderMap,
    _auth: Extension<AuthContext>,
    Path(index): Path<String>,
) -> Result<Json<IndexBody>, GatewayError> {
    let request_id = request_id_of_headers(&headers);
    let reply = state
        .proxy
        .delete_index(IndexRequest { index })
        .await
        .map_err(|status| to_gateway_error(&status, request_id))?;
    Ok(Json(IndexBody { index: reply.index }))
}

pub async fn rebuild_index(
    State(state): State<AppState>,
    headers: HeaderMap,
    _auth: Extension<AuthContext>,
    Path(index): Path<String>,
) -> Result<Json<IndexBody>, GatewayError> {
    let request_id = request_id_of_headers(&headers);
    let reply = state
        .proxy
        .rebuild_index(IndexRequest { index })
        .await
        .map_err(|status| to_gateway_error(&status, request_id))?;
    Ok(Json(IndexBody { index: reply.index }))
}
