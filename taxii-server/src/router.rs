//! Router assembly.

use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::handlers::collections::{get_collection_handler, list_collections_handler};
use crate::handlers::discovery::{api_root_handler, discovery_handler};
use crate::handlers::objects::{add_objects_handler, delete_object_handler, get_object_handler, list_objects_handler, manifest_handler, versions_handler};
use crate::handlers::status::status_handler;
use crate::state::AppState;

/// Build the full Axum router for a given [`AppState`].
///
/// `TraceLayer` wraps every request; `CatchPanicLayer` sits outermost so a
/// panicking handler still returns a JSON 500 body instead of dropping the
/// connection.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/taxii/", get(discovery_handler))
        .route("/{root}/", get(api_root_handler))
        .route("/{root}/status/{sid}/", get(status_handler))
        .route("/{root}/collections/", get(list_collections_handler))
        .route("/{root}/collections/{id}/", get(get_collection_handler))
        .route("/{root}/collections/{id}/manifest/", get(manifest_handler))
        .route("/{root}/collections/{id}/objects/", get(list_objects_handler).post(add_objects_handler))
        .route("/{root}/collections/{id}/objects/{oid}/", get(get_object_handler).delete(delete_object_handler))
        .route("/{root}/collections/{id}/objects/{oid}/versions/", get(versions_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(|panic_info| {
            error!("handler panicked: {:?}", panic_info);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }))
}
