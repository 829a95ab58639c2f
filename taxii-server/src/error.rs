//! HTTP-layer error plumbing: wraps [`taxii_core::TaxiiError`] with the
//! `IntoResponse` impl the core crate cannot provide (it does not depend on
//! axum), plus the handful of errors that originate in the HTTP layer itself
//! (header validation) before ever reaching the backend.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};

use taxii_core::TaxiiError;

/// Server result type used throughout the handler layer.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors observable at the HTTP edge: every [`TaxiiError`] the backend can
/// raise, plus header-validation failures that never reach the backend.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A domain error from the filter engine, paging store, or backend.
    #[error(transparent)]
    Taxii(#[from] TaxiiError),

    /// `Accept` header did not list a supported TAXII/STIX media type.
    #[error("Not Acceptable")]
    NotAcceptable,

    /// `Content-Type` header on a write request was not a supported media type.
    #[error("Unsupported Media Type")]
    UnsupportedMediaType,

    /// Request body exceeded the API root's `max_content_length`.
    #[error("Payload Too Large")]
    PayloadTooLarge,

    /// `Range` header was present but malformed.
    #[error("{0}")]
    MalformedRange(String),
}

/// The wire shape of an error body: `{title, http_status, description}`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    title: String,
    http_status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Taxii(e) => StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::MalformedRange(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::Taxii(e) => e.title(),
            Self::NotAcceptable => "NotAcceptable",
            Self::UnsupportedMediaType => "UnsupportedMediaType",
            Self::PayloadTooLarge => "PayloadTooLarge",
            Self::MalformedRange(_) => "ProcessingError",
        }
    }

    fn description(&self) -> Option<String> {
        match self {
            Self::Taxii(e) => Some(e.to_string()),
            Self::MalformedRange(msg) => Some(msg.clone()),
            Self::NotAcceptable | Self::UnsupportedMediaType | Self::PayloadTooLarge => None,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match &self {
            Self::Taxii(TaxiiError::Internal(_) | TaxiiError::Json(_)) => error!(error = %self, "internal error"),
            Self::Taxii(TaxiiError::BadRequest(_) | TaxiiError::UnprocessableEntity(_)) => {
                warn!(error = %self, "client sent a malformed request");
            }
            _ => debug!(error = %self, "request rejected"),
        }

        let status = self.status_code();
        let body = ErrorBody {
            title: self.title().to_string(),
            http_status: status.as_u16(),
            description: self.description(),
        };

        let rendered = serde_json::to_string(&body).unwrap_or_else(|_| {
            format!(r#"{{"title":"InternalError","http_status":{}}}"#, StatusCode::INTERNAL_SERVER_ERROR.as_u16())
        });

        let mut response = (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/vnd.oasis.taxii+json;version=2.1")],
            rendered,
        )
            .into_response();

        if let Self::Taxii(TaxiiError::RangeNotSatisfiable { total_count }) = &self {
            if let Ok(value) = axum::http::HeaderValue::from_str(&format!("items */{total_count}")) {
                response.headers_mut().insert(axum::http::header::CONTENT_RANGE, value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404_with_resource_not_found_title() {
        let err = ServerError::from(TaxiiError::NotFound("collection 'x' not found".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.title(), "ResourceNotFoundError");
    }

    #[test]
    fn forbidden_maps_to_403() {
        let err = ServerError::from(TaxiiError::Forbidden);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn malformed_range_maps_to_400_with_processing_error_title() {
        let err = ServerError::MalformedRange("bad range".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.title(), "ProcessingError");
    }

    #[test]
    fn range_not_satisfiable_response_carries_content_range_header() {
        let err = ServerError::from(TaxiiError::RangeNotSatisfiable { total_count: 5 });
        assert_eq!(err.status_code(), StatusCode::RANGE_NOT_SATISFIABLE);

        let response = ServerError::from(TaxiiError::RangeNotSatisfiable { total_count: 5 }).into_response();
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        let content_range = response.headers().get(axum::http::header::CONTENT_RANGE).expect("content-range present");
        assert_eq!(content_range.to_str().expect("ascii header"), "items */5");
    }

    #[test]
    fn not_acceptable_response_has_no_content_range_header() {
        let response = ServerError::NotAcceptable.into_response();
        assert!(response.headers().get(axum::http::header::CONTENT_RANGE).is_none());
    }
}
