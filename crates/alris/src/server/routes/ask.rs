//! Question answering and raw retrieval endpoints

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::routes::ApiJson;
use crate::server::state::AppState;
use crate::types::{AskRequest, AskResponse, SearchHit};

/// POST /ask - Answer a question from the indexed documents
pub async fn ask(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AskRequest>,
) -> Result<Json<AskResponse>> {
    let response = state.rag().ask(&request).await?;
    Ok(Json(response))
}

/// POST /search - Retrieve matching chunks without generating an answer
pub async fn search(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AskRequest>,
) -> Result<Json<Vec<SearchHit>>> {
    let hits = state.rag().search(&request).await?;
    tracing::info!("Search returned {} chunks", hits.len());
    Ok(Json(hits))
}
