//! Status resource handler.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;

use taxii_core::TaxiiError;

use super::render_status;
use crate::error::ServerResult;
use crate::http::TaxiiResponse;
use crate::state::AppState;
use crate::validation::validate_accept;

/// `GET /{root}/status/{sid}/`
pub async fn status_handler(
    State(state): State<AppState>,
    Path((api_root, status_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ServerResult<impl IntoResponse> {
    validate_accept(&headers)?;

    let status = state
        .backend
        .get_status(&api_root, &status_id)
        .await?
        .ok_or_else(|| TaxiiError::NotFound(format!("status '{status_id}' not found")))?;

    Ok(TaxiiResponse::new(render_status(&status)))
}
