//! API routes for the ALRIS server

pub mod ask;
pub mod collections;

use axum::{
    extract::FromRequest,
    routing::{get, post},
    Router,
};

use crate::error::Error;
use crate::server::state::AppState;

/// JSON request body; rejections are answered with the regular error body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ask", post(ask::ask))
        .route("/search", post(ask::search))
        .route("/collections", get(collections::list_collections))
}
