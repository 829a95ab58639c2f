//! The closed error taxonomy shared by the filter engine, the backend
//! interface, and the HTTP layer.

use thiserror::Error;

/// Errors observable at the edge of the system, each carrying an implicit
/// HTTP status via [`TaxiiError::status_code`].
#[derive(Debug, Error)]
pub enum TaxiiError {
    /// Unknown or uncoercible filter value, invalid `next`, changed paging
    /// params, or a malformed `Range` header.
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid credentials; delegated to the auth collaborator.
    #[error("Unauthorized")]
    Unauthorized,

    /// Collection is not readable/writable by the caller.
    #[error("Forbidden")]
    Forbidden,

    /// Unknown api root, collection, object, or status id.
    #[error("{0}")]
    NotFound(String),

    /// `Accept` header does not list a supported media type.
    #[error("Not Acceptable")]
    NotAcceptable,

    /// Envelope lacks `objects` or is not a JSON object.
    #[error("{0}")]
    UnprocessableEntity(String),

    /// `Range` header start is at or beyond `total_count`.
    #[error("Range Not Satisfiable")]
    RangeNotSatisfiable {
        /// Total number of items in the requested collection.
        total_count: usize,
    },

    /// Invariant violation in the backend (e.g. missing meta on load).
    #[error("Internal error: {0}")]
    Internal(String),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TaxiiError {
    /// The HTTP status code this error maps to.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound(_) => 404,
            Self::NotAcceptable => 406,
            Self::UnprocessableEntity(_) => 422,
            Self::RangeNotSatisfiable { .. } => 416,
            Self::Internal(_) | Self::Json(_) => 500,
        }
    }

    /// A short machine-stable title for the error body, mirroring the
    /// `title` field medallion's `ProcessingError` responses carry.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "ProcessingError",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::NotFound(_) => "ResourceNotFoundError",
            Self::NotAcceptable => "NotAcceptable",
            Self::UnprocessableEntity(_) => "UnprocessableEntity",
            Self::RangeNotSatisfiable { .. } => "RangeNotSatisfiable",
            Self::Internal(_) | Self::Json(_) => "InternalError",
        }
    }
}

/// Convenience alias used throughout the crate.
pub type TaxiiResult<T> = Result<T, TaxiiError>;
