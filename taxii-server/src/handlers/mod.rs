//! Request handlers, one module per resource family.

pub mod collections;
pub mod discovery;
pub mod objects;
pub mod status;

use taxii_core::backend::Page;
use taxii_core::entities::{Status, StatusDetail, StatusKind};
use taxii_core::time::to_taxii_string;

use crate::error::ServerError;
use crate::responses::{StatusDetailResponse, StatusResponse};
use crate::validation::ItemsRange;

/// Build the `X-TAXII-Date-Added-First`/`-Last` headers from a page's first
/// and last element.
pub(crate) fn date_added_headers<T>(page: &Page<T>, date_added: impl Fn(&T) -> chrono::DateTime<chrono::Utc>) -> Vec<(String, String)> {
    let Some(first) = page.items.first() else {
        return Vec::new();
    };
    let last = page.items.last().unwrap_or(first);
    vec![
        ("X-TAXII-Date-Added-First".to_string(), to_taxii_string(&date_added(first))),
        ("X-TAXII-Date-Added-Last".to_string(), to_taxii_string(&date_added(last))),
    ]
}

/// A resolved slice of a full, unpaginated result set honoring an HTTP
/// `Range: items N-M` request, independent of the `limit`/`next` session
/// mechanism used when no `Range` header is present.
pub(crate) struct RangeSlice {
    pub start: usize,
    pub end: usize,
    pub total: usize,
    pub partial: bool,
}

/// Resolve a parsed [`ItemsRange`] against the total item count. Fails with
/// `RangeNotSatisfiable` if `start >= total`, including when `start` equals
/// `total` exactly (an empty trailing range is still unsatisfiable).
pub(crate) fn resolve_range(range: ItemsRange, total: usize) -> Result<RangeSlice, ServerError> {
    if range.start >= total {
        return Err(ServerError::Taxii(taxii_core::TaxiiError::RangeNotSatisfiable { total_count: total }));
    }
    let end = range.end.min(total - 1);
    let partial = range.start != 0 || end != total - 1;
    Ok(RangeSlice { start: range.start, end, total, partial })
}

pub(crate) fn content_range_header(slice: &RangeSlice) -> (String, String) {
    ("Content-Range".to_string(), format!("items {}-{}/{}", slice.start, slice.end, slice.total))
}

fn render_status_detail(d: &StatusDetail) -> StatusDetailResponse {
    StatusDetailResponse { id: d.id.clone(), version: d.version.clone(), message: d.message.clone() }
}

/// Project a [`Status`] record into its wire shape.
pub(crate) fn render_status(status: &Status) -> StatusResponse {
    StatusResponse {
        id: status.id.clone(),
        status: match status.status {
            StatusKind::Complete => "complete",
            StatusKind::Pending => "pending",
        },
        request_timestamp: to_taxii_string(&status.request_timestamp),
        success_count: status.success_count(),
        failure_count: status.failure_count(),
        pending_count: status.pending_count(),
        total_count: status.total_count(),
        successes: status.successes.iter().map(render_status_detail).collect(),
        failures: status.failures.iter().map(render_status_detail).collect(),
        pendings: status.pendings.iter().map(render_status_detail).collect(),
    }
}
