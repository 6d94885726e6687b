//! `/api/v1/documents[/{index}/{id}]` and `/api/v1/documents/batch`.
//!
//! The coordinator is stateless and returns `Unimplemented` for every one of
//! these (see `coordinator::service`'s doc comments) — these handlers exist
//! so the routes are wired end to end, per §6: "the RPC surface must still
//! exist so the gateway's routes are meaningful."

use std::collections::HashMap;

use axum::extract::{Extension, Path, State};
use axum::http::HeaderMap;
use axum::Json;
use coordinator::proto::{BatchDocumentsRequest, DocumentReply, DocumentRequest};
use search_errors::{to_gateway_error, GatewayError};
use serde::{Deserialize, Serialize};

use crate::auth::AuthContext;
use crate::request_id::request_id_of_headers;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DocumentPayload {
    #[serde(default)]
    pub fields: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentReplyBody {
    pub found: bool,
}

impl From<DocumentReply> for DocumentReplyBody {
    fn from(r: DocumentReply) -> Self {
        Self { found: r.found }
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchDocumentEntry {
    pub index: String,
    pub doc_id: String,
    #[serde(default)]
    pub fields: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchPayload {
    pub documents: Vec<BatchDocumentEntry>,
}

#[derive(Debug, Serialize)]
pub struct BatchReplyBody {
    pub accepted: u32,
}

pub async fn add_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    _auth: Extension<AuthContext>,
    Path((index, doc_id)): Path<(String, String)>,
    Json(payload): Json<DocumentPayload>,
) -> Result<Json<DocumentReplyBody>, GatewayError> {
    let request_id = request_id_of_headers(&headers);
    let reply = state
        .proxy
        .add_document(DocumentRequest { index, doc_id, fields: payload.fields })
        .await
        .map_err(|status| to_gateway_error(&status, request_id))?;
    Ok(Json(reply.into()))
}

pub async fn get_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    _auth: Extension<AuthContext>,
    Path((index, doc_id)): Path<(String, String)>,
) -> Result<Json<DocumentReplyBody>, GatewayError> {
    let request_id = request_id_of_headers(&headers);
    let reply = state
        .proxy
        .get_document(DocumentRequest { index, doc_id, fields: HashMap::new() })
        .await
        .map_err(|status| to_gateway_error(&status, request_id))?;
    Ok(Json(reply.into()))
}

pub async fn update_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    _auth: Extension<AuthContext>,
    Path((index, doc_id)): Path<(String, String)>,
    Json(payload): Json<DocumentPayload>,
) -> Result<Json<DocumentReplyBody>, GatewayError> {
    let request_id = request_id_of_headers(&headers);
    let reply = state
        .proxy
        .update_document(DocumentRequest { index, doc_id, fields: payload.fields })
        .await
        .map_err(|status| to_gateway_error(&status, request_id))?;
    Ok(Json(reply.into()))
}

pub async fn delete_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    _auth: Extension<AuthContext>,
    Path((index, doc_id)): Path<(String, String)>,
) -> Result<Json<DocumentReplyBody>, GatewayError> {
    let request_id = request_id_of_headers(&headers);
    let reply = state
        .proxy
        .delete_document(DocumentRequest { index, doc_id, fields: HashMap::new() })
        .await
        .map_err(|status| to_gateway_error(&status, request_id))?;
    Ok(Json(reply.into()))
}

pub async fn batch_documents(
    State(state): State<AppState>,
    headers: HeaderMap,
    _auth: Extension<AuthContext>,
    Json(payload): Json<BatchPayload>,
) -> Result<Json<BatchReplyBody>, GatewayError> {
    let request_id = request_id_of_headers(&headers);
    let documents = payload
        .documents
        .into_iter()
        .map(|d| DocumentRequest { index: d.index, doc_id: d.doc_id, fields: d.fields })
        .collect();
    let reply = state
        .proxy
        .batch_documents(BatchDocumentsRequest { documents })
        .await
        .map_err(|status| to_gateway_error(&status, request_id))?;
    Ok(Json(BatchReplyBody { accepted: reply.accepted }))
}
