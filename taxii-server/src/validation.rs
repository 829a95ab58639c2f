//! HTTP-edge validation: `Accept`/`Content-Type` gating, query-string to
//! [`FilterArgs`] translation, and the legacy `Range`-header slicing
//! affordance layered on top of the backend's `limit`/`next` pagination.

use std::collections::HashMap;

use axum::http::HeaderMap;
use axum::http::header;
use regex::Regex;
use std::sync::LazyLock;
use taxii_core::backend::FilterArgs;

use crate::error::ServerError;

const TAXII_MEDIA_PREFIX: &str = "application/vnd.oasis.taxii+json";
const STIX_MEDIA_PREFIX: &str = "application/vnd.oasis.stix+json";

/// `Accept` must name a supported TAXII or STIX media type, or `*/*`.
pub fn validate_accept(headers: &HeaderMap) -> Result<(), ServerError> {
    let accept = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()).unwrap_or("*/*");
    let ok = accept.split(',').map(str::trim).any(|part| {
        part == "*/*" || part.starts_with(TAXII_MEDIA_PREFIX) || part.starts_with(STIX_MEDIA_PREFIX)
    });
    if ok { Ok(()) } else { Err(ServerError::NotAcceptable) }
}

/// `Content-Type` on a write request must name a supported TAXII or STIX media type.
pub fn validate_content_type(headers: &HeaderMap) -> Result<(), ServerError> {
    let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("");
    if content_type.starts_with(TAXII_MEDIA_PREFIX) || content_type.starts_with(STIX_MEDIA_PREFIX) {
        Ok(())
    } else {
        Err(ServerError::UnsupportedMediaType)
    }
}

/// Reject a request body larger than the API root's `max_content_length`.
pub fn validate_content_length(body_len: usize, max_len: u64) -> Result<(), ServerError> {
    if body_len as u64 > max_len {
        Err(ServerError::PayloadTooLarge)
    } else {
        Ok(())
    }
}

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^items (\d+)-(\d+)$").unwrap_or_else(|_| unreachable!()));

/// A parsed `Range: items N-M` header, zero-indexed and inclusive.
#[derive(Debug, Clone, Copy)]
pub struct ItemsRange {
    pub start: usize,
    pub end: usize,
}

/// Parse an optional `Range` header. A present-but-malformed header is a 400;
/// absence is not an error (the caller falls back to ordinary `limit`/`next`
/// pagination).
pub fn parse_range(headers: &HeaderMap) -> Result<Option<ItemsRange>, ServerError> {
    let Some(raw) = headers.get(header::RANGE).and_then(|v| v.to_str().ok()) else {
        return Ok(None);
    };
    let caps = RANGE_RE
        .captures(raw)
        .ok_or_else(|| ServerError::MalformedRange(format!("'{raw}' is not a valid Range header")))?;
    let start: usize = caps[1]
        .parse()
        .map_err(|_| ServerError::MalformedRange(format!("'{raw}' is not a valid Range header")))?;
    let end: usize = caps[2]
        .parse()
        .map_err(|_| ServerError::MalformedRange(format!("'{raw}' is not a valid Range header")))?;
    Ok(Some(ItemsRange { start, end }))
}

/// Translate raw query-string parameters into [`FilterArgs`]: `limit`/`next`
/// are pulled out, `added_after` is kept bare, and `match[<field>]` entries
/// are unwrapped to their bare field name.
pub fn parse_filter_args(params: &HashMap<String, String>) -> Result<FilterArgs, ServerError> {
    let mut raw = HashMap::new();
    let mut next = None;
    let mut limit = None;

    for (key, value) in params {
        match key.as_str() {
            "next" => next = Some(value.clone()),
            "limit" => {
                let parsed: usize = value
                    .parse()
                    .map_err(|_| taxii_core::TaxiiError::BadRequest(format!("'{value}' is not a valid limit")))?;
                limit = Some(parsed);
            }
            "added_after" => {
                raw.insert("added_after".to_string(), value.clone());
            }
            other => {
                if let Some(field) = other.strip_prefix("match[").and_then(|s| s.strip_suffix(']')) {
                    raw.insert(field.to_string(), value.clone());
                }
            }
        }
    }

    Ok(FilterArgs { raw, next, limit })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).expect("valid header value"));
        headers
    }

    #[test]
    fn accept_missing_header_is_allowed() {
        assert!(validate_accept(&HeaderMap::new()).is_ok());
    }

    #[test]
    fn accept_wildcard_is_allowed() {
        let headers = headers_with(header::ACCEPT, "*/*");
        assert!(validate_accept(&headers).is_ok());
    }

    #[test]
    fn accept_taxii_media_type_is_allowed() {
        let headers = headers_with(header::ACCEPT, "application/vnd.oasis.taxii+json;version=2.1");
        assert!(validate_accept(&headers).is_ok());
    }

    #[test]
    fn accept_unrelated_media_type_is_rejected() {
        let headers = headers_with(header::ACCEPT, "text/html");
        assert!(matches!(validate_accept(&headers), Err(ServerError::NotAcceptable)));
    }

    #[test]
    fn content_type_stix_envelope_is_allowed() {
        let headers = headers_with(header::CONTENT_TYPE, "application/vnd.oasis.stix+json;version=2.1");
        assert!(validate_content_type(&headers).is_ok());
    }

    #[test]
    fn content_type_missing_is_rejected() {
        assert!(matches!(validate_content_type(&HeaderMap::new()), Err(ServerError::UnsupportedMediaType)));
    }

    #[test]
    fn content_length_within_bound_is_allowed() {
        assert!(validate_content_length(100, 200).is_ok());
    }

    #[test]
    fn content_length_over_bound_is_rejected() {
        assert!(matches!(validate_content_length(300, 200), Err(ServerError::PayloadTooLarge)));
    }

    #[test]
    fn range_header_absent_yields_none() {
        assert!(parse_range(&HeaderMap::new()).expect("no header is not an error").is_none());
    }

    #[test]
    fn range_header_parses_start_and_end() {
        let headers = headers_with(header::RANGE, "items 2-5");
        let range = parse_range(&headers).expect("valid range").expect("present");
        assert_eq!(range.start, 2);
        assert_eq!(range.end, 5);
    }

    #[test]
    fn range_header_malformed_is_rejected() {
        let headers = headers_with(header::RANGE, "bytes 2-5");
        assert!(matches!(parse_range(&headers), Err(ServerError::MalformedRange(_))));
    }

    #[test]
    fn filter_args_unwraps_match_brackets_and_keeps_added_after_bare() {
        let mut params = HashMap::new();
        params.insert("match[id]".to_string(), "indicator--abc".to_string());
        params.insert("match[version]".to_string(), "all".to_string());
        params.insert("added_after".to_string(), "2016-01-01T00:00:00Z".to_string());
        params.insert("limit".to_string(), "10".to_string());
        params.insert("next".to_string(), "session-token".to_string());

        let filter = parse_filter_args(&params).expect("well-formed params");
        assert_eq!(filter.raw.get("id").map(String::as_str), Some("indicator--abc"));
        assert_eq!(filter.raw.get("version").map(String::as_str), Some("all"));
        assert_eq!(filter.raw.get("added_after").map(String::as_str), Some("2016-01-01T00:00:00Z"));
        assert_eq!(filter.limit, Some(10));
        assert_eq!(filter.next, Some("session-token".to_string()));
    }

    #[test]
    fn filter_args_rejects_non_numeric_limit() {
        let mut params = HashMap::new();
        params.insert("limit".to_string(), "not-a-number".to_string());
        assert!(parse_filter_args(&params).is_err());
    }
}
