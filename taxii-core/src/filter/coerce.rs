//! Type coercion of raw query-string filter values.

use chrono::{DateTime, Utc};

use crate::error::TaxiiError;
use crate::time::parse_timestamp;
use super::tables::tlp_short_name_to_id;

/// A coerced filter value, ready for equality/comparison against object
/// properties.
#[derive(Debug, Clone, PartialEq)]
pub enum CoercedValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

/// The type coercer applied to one recognized filter's comma-split values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercer {
    /// Identity.
    String,
    /// Base-10 integer parse; rejects anything else.
    Integer,
    /// STIX-style boolean: the literal string `"false"` is `false`, any
    /// other non-empty string is `true`.
    Boolean,
    /// Parses both microsecond-Z and second-Z timestamp forms.
    Timestamp,
    /// TLP short name resolved to a fixed marking-definition id; idempotent
    /// on an already-valid id.
    TlpShortName,
}

impl Coercer {
    /// Coerce one raw value. Fails with [`TaxiiError::BadRequest`] on an
    /// uncoercible value for a *recognized* filter.
    pub fn coerce(self, raw: &str) -> Result<CoercedValue, TaxiiError> {
        match self {
            Self::String => Ok(CoercedValue::Str(raw.to_string())),
            Self::Integer => raw
                .parse::<i64>()
                .map(CoercedValue::Int)
                .map_err(|_| TaxiiError::BadRequest(format!("'{raw}' is not a valid integer"))),
            Self::Boolean => Ok(CoercedValue::Bool(raw != "false" && !raw.is_empty())),
            Self::Timestamp => parse_timestamp(raw)
                .map(CoercedValue::Timestamp)
                .map_err(|_| TaxiiError::BadRequest(format!("'{raw}' is not a valid timestamp"))),
            Self::TlpShortName => tlp_short_name_to_id(raw)
                .map(CoercedValue::Str)
                .ok_or_else(|| TaxiiError::BadRequest(format!("'{raw}' is not a valid TLP marking"))),
        }
    }
}

/// Does a JSON value (scalar string/number/bool or a string-able value)
/// equal this coerced value?
#[must_use]
pub fn value_matches(json: &serde_json::Value, coerced: &CoercedValue) -> bool {
    match coerced {
        CoercedValue::Str(s) => json.as_str().is_some_and(|v| v == s),
        CoercedValue::Int(i) => json.as_i64().is_some_and(|v| v == *i),
        CoercedValue::Bool(b) => json.as_bool().is_some_and(|v| v == *b),
        CoercedValue::Timestamp(ts) => json
            .as_str()
            .and_then(|s| parse_timestamp(s).ok())
            .is_some_and(|v| v == *ts),
    }
}
