//! STIX object, manifest, and version handlers.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use chrono::Utc;
use serde_json::Value;

use taxii_core::TaxiiError;
use taxii_core::backend::{OBJECTS_ALLOWED_FILTERS, Page};
use taxii_core::entities::StixObject;
use taxii_core::time::to_taxii_string;

use super::{content_range_header, date_added_headers, render_status, resolve_range};
use crate::error::{ServerError, ServerResult};
use crate::http::{EmptyResponse, TaxiiResponse};
use crate::responses::{ManifestResponse, ManifestResponseEntry, ObjectsResponse, VersionsResponse};
use crate::state::{AppState, effective_limit};
use crate::validation::{parse_filter_args, parse_range, validate_accept, validate_content_length, validate_content_type};

fn render_object(o: &StixObject) -> Value {
    o.body.clone()
}

async fn require_readable(state: &AppState, api_root: &str, collection_id: &str) -> ServerResult<()> {
    let summary = state
        .backend
        .get_collection(api_root, collection_id)
        .await?
        .ok_or_else(|| TaxiiError::NotFound(format!("collection '{collection_id}' not found")))?;
    if !summary.can_read {
        return Err(TaxiiError::Forbidden.into());
    }
    Ok(())
}

async fn require_writable(state: &AppState, api_root: &str, collection_id: &str) -> ServerResult<()> {
    let summary = state
        .backend
        .get_collection(api_root, collection_id)
        .await?
        .ok_or_else(|| TaxiiError::NotFound(format!("collection '{collection_id}' not found")))?;
    if !summary.can_write {
        return Err(TaxiiError::Forbidden.into());
    }
    Ok(())
}

/// `GET /{root}/collections/{id}/objects/`
pub async fn list_objects_handler(
    State(state): State<AppState>,
    Path((api_root, collection_id)): Path<(String, String)>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ServerResult<axum::response::Response> {
    validate_accept(&headers)?;
    require_readable(&state, &api_root, &collection_id).await?;

    if let Some(range) = parse_range(&headers)? {
        return range_objects(&state, &api_root, &collection_id, &params, range).await;
    }

    let mut filter = parse_filter_args(&params)?;
    filter.limit = Some(effective_limit(filter.limit, state.config.default_pagination_limit, state.config.max_pagination_limit));

    let page = state
        .backend
        .get_objects(&api_root, &collection_id, &filter, OBJECTS_ALLOWED_FILTERS)
        .await?
        .ok_or_else(|| TaxiiError::NotFound(format!("collection '{collection_id}' not found")))?;

    Ok(render_objects_page(&page).into_response())
}

fn render_objects_page(page: &Page<StixObject>) -> impl IntoResponse {
    let headers = date_added_headers(page, |o| o.meta.date_added);
    let objects = if page.items.is_empty() { None } else { Some(page.items.iter().map(render_object).collect()) };
    TaxiiResponse::new(ObjectsResponse { more: Some(page.more), next: page.next.clone(), objects }).stix().with_headers(headers)
}

async fn range_objects(
    state: &AppState,
    api_root: &str,
    collection_id: &str,
    params: &HashMap<String, String>,
    range: crate::validation::ItemsRange,
) -> ServerResult<axum::response::Response> {
    let mut filter = parse_filter_args(params)?;
    filter.next = None;
    filter.limit = Some(usize::MAX);

    let page = state
        .backend
        .get_objects(api_root, collection_id, &filter, OBJECTS_ALLOWED_FILTERS)
        .await?
        .ok_or_else(|| TaxiiError::NotFound(format!("collection '{collection_id}' not found")))?;

    let slice = resolve_range(range, page.items.len())?;
    let sliced = &page.items[slice.start..=slice.end];
    let status = if slice.partial { StatusCode::PARTIAL_CONTENT } else { StatusCode::OK };

    let mut header_pairs = date_added_headers(
        &Page { items: sliced.to_vec(), more: false, next: None },
        |o| o.meta.date_added,
    );
    header_pairs.push(content_range_header(&slice));

    let objects = if sliced.is_empty() { None } else { Some(sliced.iter().map(render_object).collect()) };
    let body = ObjectsResponse { more: Some(false), next: None, objects };

    Ok(TaxiiResponse::with_status(body, status).stix().with_headers(header_pairs).into_response())
}

/// `GET /{root}/collections/{id}/manifest/`
pub async fn manifest_handler(
    State(state): State<AppState>,
    Path((api_root, collection_id)): Path<(String, String)>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ServerResult<impl IntoResponse> {
    validate_accept(&headers)?;
    require_readable(&state, &api_root, &collection_id).await?;

    let mut filter = parse_filter_args(&params)?;
    filter.limit = Some(effective_limit(filter.limit, state.config.default_pagination_limit, state.config.max_pagination_limit));

    let page = state
        .backend
        .get_object_manifest(&api_root, &collection_id, &filter, OBJECTS_ALLOWED_FILTERS)
        .await?
        .ok_or_else(|| TaxiiError::NotFound(format!("collection '{collection_id}' not found")))?;

    let headers_out = date_added_headers(&page, |e| e.date_added);
    let objects = if page.items.is_empty() {
        None
    } else {
        Some(
            page.items
                .iter()
                .map(|e| ManifestResponseEntry {
                    id: e.id.clone(),
                    date_added: to_taxii_string(&e.date_added),
                    version: to_taxii_string(&e.version),
                    media_type: e.media_type.clone(),
                })
                .collect(),
        )
    };

    Ok(TaxiiResponse::new(ManifestResponse { more: Some(page.more), next: page.next, objects }).with_headers(headers_out))
}

/// `GET /{root}/collections/{id}/objects/{oid}/`
pub async fn get_object_handler(
    State(state): State<AppState>,
    Path((api_root, collection_id, object_id)): Path<(String, String, String)>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ServerResult<impl IntoResponse> {
    validate_accept(&headers)?;
    require_readable(&state, &api_root, &collection_id).await?;

    let mut filter = parse_filter_args(&params)?;
    filter.limit = Some(effective_limit(filter.limit, state.config.default_pagination_limit, state.config.max_pagination_limit));

    let page = state
        .backend
        .get_object(&api_root, &collection_id, &object_id, &filter, OBJECTS_ALLOWED_FILTERS)
        .await?;

    Ok(render_objects_page(&page))
}

/// `DELETE /{root}/collections/{id}/objects/{oid}/`
pub async fn delete_object_handler(
    State(state): State<AppState>,
    Path((api_root, collection_id, object_id)): Path<(String, String, String)>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ServerResult<impl IntoResponse> {
    validate_accept(&headers)?;
    require_writable(&state, &api_root, &collection_id).await?;

    let filter = parse_filter_args(&params)?;
    state
        .backend
        .delete_object(&api_root, &collection_id, &object_id, &filter, OBJECTS_ALLOWED_FILTERS)
        .await?;

    Ok(EmptyResponse::new())
}

/// `GET /{root}/collections/{id}/objects/{oid}/versions/`
pub async fn versions_handler(
    State(state): State<AppState>,
    Path((api_root, collection_id, object_id)): Path<(String, String, String)>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ServerResult<impl IntoResponse> {
    validate_accept(&headers)?;
    require_readable(&state, &api_root, &collection_id).await?;

    let mut filter = parse_filter_args(&params)?;
    filter.limit = Some(effective_limit(filter.limit, state.config.default_pagination_limit, state.config.max_pagination_limit));

    let page = state
        .backend
        .get_object_versions(&api_root, &collection_id, &object_id, &filter, OBJECTS_ALLOWED_FILTERS)
        .await?;

    let headers_out = date_added_headers(&Page { items: page.items.clone(), more: page.more, next: page.next.clone() }, |v| *v);
    let versions = if page.items.is_empty() { None } else { Some(page.items.iter().map(to_taxii_string).collect()) };

    Ok(TaxiiResponse::new(VersionsResponse { more: Some(page.more), next: page.next, versions }).with_headers(headers_out))
}

/// `POST /{root}/collections/{id}/objects/`
pub async fn add_objects_handler(
    State(state): State<AppState>,
    Path((api_root, collection_id)): Path<(String, String)>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> ServerResult<impl IntoResponse> {
    validate_accept(&headers)?;
    validate_content_type(&headers)?;

    require_writable(&state, &api_root, &collection_id).await?;

    let info = state
        .backend
        .get_api_root_information(&api_root)
        .await?
        .ok_or_else(|| TaxiiError::NotFound(format!("api root '{api_root}' not found")))?;
    validate_content_length(body.len(), info.max_content_length)?;

    let envelope: Value = serde_json::from_slice(&body)
        .map_err(|e| ServerError::Taxii(TaxiiError::UnprocessableEntity(format!("request body is not valid JSON: {e}"))))?;
    if !envelope.is_object() {
        return Err(ServerError::Taxii(TaxiiError::UnprocessableEntity("envelope must be a JSON object".to_string())));
    }

    let status = state.backend.add_objects(&api_root, &collection_id, envelope, Utc::now()).await?;

    Ok(TaxiiResponse::with_status(render_status(&status), StatusCode::ACCEPTED))
}
