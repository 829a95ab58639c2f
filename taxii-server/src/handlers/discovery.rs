//! Discovery and API root handlers.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;

use taxii_core::TaxiiError;

use crate::error::ServerResult;
use crate::http::TaxiiResponse;
use crate::responses::{ApiRootResponse, DiscoveryResponse};
use crate::state::AppState;
use crate::validation::validate_accept;

/// `GET /taxii/`
pub async fn discovery_handler(State(state): State<AppState>, headers: HeaderMap) -> ServerResult<impl IntoResponse> {
    validate_accept(&headers)?;

    let discovery = state.backend.server_discovery().await?;

    let response = match discovery {
        Some(d) => DiscoveryResponse {
            title: d.title,
            description: d.description,
            contact: d.contact,
            default: d.default.map(|name| format!("/{name}/")),
            api_roots: d.api_roots.iter().map(|name| format!("/{name}/")).collect(),
        },
        None => DiscoveryResponse {
            title: state.config.title.clone(),
            description: state.config.description.clone(),
            contact: state.config.contact.clone(),
            default: None,
            api_roots: Vec::new(),
        },
    };

    Ok(TaxiiResponse::new(response))
}

/// `GET /{root}/`
pub async fn api_root_handler(State(state): State<AppState>, Path(api_root): Path<String>, headers: HeaderMap) -> ServerResult<impl IntoResponse> {
    validate_accept(&headers)?;

    let info = state
        .backend
        .get_api_root_information(&api_root)
        .await?
        .ok_or_else(|| TaxiiError::NotFound(format!("api root '{api_root}' not found")))?;

    Ok(TaxiiResponse::new(ApiRootResponse {
        title: info.title,
        description: info.description,
        versions: info.versions,
        max_content_length: info.max_content_length,
    }))
}
