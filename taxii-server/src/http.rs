//! TAXII HTTP response helpers: the wrapper types and content-type constants
//! shared by every handler.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::error::ServerError;

/// TAXII resource content type.
pub const TAXII_CONTENT_TYPE: &str = "application/vnd.oasis.taxii+json;version=2.1";

/// STIX object-envelope content type.
pub const STIX_CONTENT_TYPE: &str = "application/vnd.oasis.stix+json;version=2.1";

/// A JSON response carrying a content type, an HTTP status, and any extra
/// headers (pagination markers, date-added bounds, `Content-Range`).
///
/// Defaults to the TAXII content type; object envelopes (the `objects`
/// resource) switch to [`STIX_CONTENT_TYPE`] via [`TaxiiResponse::stix`],
/// matching spec.md §6's split between TAXII resources and STIX envelopes.
pub struct TaxiiResponse<T: Serialize> {
    pub data: T,
    pub status: StatusCode,
    pub content_type: &'static str,
    pub extra_headers: Vec<(String, String)>,
}

impl<T: Serialize> TaxiiResponse<T> {
    #[must_use]
    pub fn new(data: T) -> Self {
        Self { data, status: StatusCode::OK, content_type: TAXII_CONTENT_TYPE, extra_headers: Vec::new() }
    }

    #[must_use]
    pub fn with_status(data: T, status: StatusCode) -> Self {
        Self { data, status, content_type: TAXII_CONTENT_TYPE, extra_headers: Vec::new() }
    }

    /// Switch this response's content type to [`STIX_CONTENT_TYPE`], for
    /// object-envelope bodies.
    #[must_use]
    pub fn stix(mut self) -> Self {
        self.content_type = STIX_CONTENT_TYPE;
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.extra_headers = headers;
        self
    }
}

/// A body-less TAXII response, e.g. a successful `DELETE`.
pub struct EmptyResponse {
    pub status: StatusCode,
}

impl EmptyResponse {
    #[must_use]
    pub fn new() -> Self {
        Self { status: StatusCode::OK }
    }
}

impl Default for EmptyResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl IntoResponse for EmptyResponse {
    fn into_response(self) -> Response {
        (self.status, [(axum::http::header::CONTENT_TYPE, TAXII_CONTENT_TYPE)], "").into_response()
    }
}

impl<T: Serialize> IntoResponse for TaxiiResponse<T> {
    fn into_response(self) -> Response {
        let body = match serde_json::to_string(&self.data) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "failed to serialize response body");
                return ServerError::from(taxii_core::TaxiiError::Internal("response serialization failed".to_string()))
                    .into_response();
            }
        };

        let mut response = (self.status, [(axum::http::header::CONTENT_TYPE, self.content_type)], body).into_response();

        let headers = response.headers_mut();
        for (key, value) in &self.extra_headers {
            if let (Ok(name), Ok(val)) =
                (axum::http::header::HeaderName::try_from(key.as_str()), axum::http::header::HeaderValue::from_str(value))
            {
                headers.insert(name, val);
            }
        }

        response
    }
}
