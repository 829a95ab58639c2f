//! Collection listing handlers.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;

use taxii_core::TaxiiError;

use crate::error::ServerResult;
use crate::http::TaxiiResponse;
use crate::responses::CollectionsResponse;
use crate::state::AppState;
use crate::validation::validate_accept;

/// `GET /{root}/collections/`
pub async fn list_collections_handler(
    State(state): State<AppState>,
    Path(api_root): Path<String>,
    headers: HeaderMap,
) -> ServerResult<impl IntoResponse> {
    validate_accept(&headers)?;

    let collections = state
        .backend
        .get_collections(&api_root)
        .await?
        .ok_or_else(|| TaxiiError::NotFound(format!("api root '{api_root}' not found")))?;

    Ok(TaxiiResponse::new(CollectionsResponse { collections }))
}

/// `GET /{root}/collections/{id}/`
pub async fn get_collection_handler(
    State(state): State<AppState>,
    Path((api_root, collection_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ServerResult<impl IntoResponse> {
    validate_accept(&headers)?;

    let summary = state
        .backend
        .get_collection(&api_root, &collection_id)
        .await?
        .ok_or_else(|| TaxiiError::NotFound(format!("collection '{collection_id}' not found")))?;

    Ok(TaxiiResponse::new(summary))
}
