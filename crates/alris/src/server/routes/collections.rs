//! Collection listing

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::CollectionsResponse;

/// GET /collections - List the collections in the vector store
pub async fn list_collections(State(state): State<AppState>) -> Result<Json<CollectionsResponse>> {
    let collections = state.rag().collections().await?;
    Ok(Json(CollectionsResponse { collections }))
}
