//! Object Meta: the server-maintained sidecar record attached to every
//! stored object, and its stamping rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::parse_timestamp;

/// Per-object sidecar metadata. Never serialized into the object's own body.
#[derive(Debug, Clone, PartialEq)]
pub struct Meta {
    /// When the backend first accepted this object. Server-assigned, never
    /// client-supplied.
    pub date_added: DateTime<Utc>,
    /// The STIX/TAXII media type this object was accepted under.
    pub media_type: String,
    /// The object's logical revision: parsed `modified` ∥ `created` ∥ `date_added`.
    pub version: DateTime<Utc>,
    /// The raw spec_version string (e.g. `"2.1"`).
    pub spec_version: String,
    /// `spec_version` split on `.` and parsed as integers, for ordered comparison.
    pub spec_version_tuple: Vec<u32>,
}

/// The subset of [`Meta`] that is actually persisted; `version` and
/// `spec_version_tuple` are re-derived from the object body on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedMeta {
    pub date_added: DateTime<Utc>,
    pub media_type: String,
}

impl Meta {
    /// The persisted projection of this metadata.
    #[must_use]
    pub fn to_persisted(&self) -> PersistedMeta {
        PersistedMeta {
            date_added: self.date_added,
            media_type: self.media_type.clone(),
        }
    }
}

/// Given a STIX 2.x object body, determine its spec version: an object
/// missing both `created` and `modified` is an SCO and implicitly spec
/// version `2.1`; otherwise `spec_version` defaults to `"2.0"` when absent.
#[must_use]
pub fn determine_spec_version(body: &serde_json::Value) -> String {
    let has_created = body.get("created").is_some();
    let has_modified = body.get("modified").is_some();
    if !has_created && !has_modified {
        return "2.1".to_string();
    }
    body.get("spec_version")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("2.0")
        .to_string()
}

/// Parse a spec version string into an ordered tuple of integer components.
#[must_use]
pub fn spec_version_tuple(spec_version: &str) -> Vec<u32> {
    spec_version
        .split('.')
        .map(|part| part.parse::<u32>().unwrap_or(0))
        .collect()
}

/// Given `modified` ∥ `created` ∥ `date_added`, determine the object's version.
#[must_use]
pub fn determine_version(body: &serde_json::Value, date_added: DateTime<Utc>) -> DateTime<Utc> {
    let raw = body
        .get("modified")
        .or_else(|| body.get("created"))
        .and_then(serde_json::Value::as_str);

    match raw.map(parse_timestamp) {
        Some(Ok(dt)) => dt,
        _ => date_added,
    }
}

/// Stamp an object's metadata on insert.
///
/// `existing` is the meta already recorded for this exact `(id, version)`
/// pair, if this is a re-stamp of an object reloaded from persistence.
#[must_use]
pub fn stamp(
    body: &serde_json::Value,
    existing: Option<&PersistedMeta>,
    now: DateTime<Utc>,
    default_media_type: &str,
) -> Meta {
    let date_added = existing.map_or(now, |m| m.date_added);
    let version = determine_version(body, date_added);
    let media_type = existing.map_or_else(|| default_media_type.to_string(), |m| m.media_type.clone());
    let spec_version = determine_spec_version(body);
    let spec_version_tuple = spec_version_tuple(&spec_version);

    Meta {
        date_added,
        media_type,
        version,
        spec_version,
        spec_version_tuple,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sco_without_created_or_modified_is_spec_21() {
        let body = json!({"id": "file--abc", "type": "file", "name": "a.txt"});
        assert_eq!(determine_spec_version(&body), "2.1");
    }

    #[test]
    fn sdo_defaults_to_spec_20_when_absent() {
        let body = json!({"id": "indicator--abc", "type": "indicator", "created": "2016-01-01T00:00:00Z"});
        assert_eq!(determine_spec_version(&body), "2.0");
    }

    #[test]
    fn explicit_spec_version_is_honored() {
        let body = json!({"id": "indicator--abc", "created": "2016-01-01T00:00:00Z", "spec_version": "2.1"});
        assert_eq!(determine_spec_version(&body), "2.1");
    }

    #[test]
    fn version_prefers_modified_over_created() {
        let body = json!({
            "created": "2016-01-01T00:00:00.000000Z",
            "modified": "2017-01-27T20:03:04.000000Z",
        });
        let now = parse_timestamp("2020-01-01T00:00:00.000000Z").expect("valid");
        let version = determine_version(&body, now);
        assert_eq!(crate::time::to_taxii_string(&version), "2017-01-27T20:03:04.000000Z");
    }

    #[test]
    fn version_falls_back_to_date_added_when_neither_present() {
        let body = json!({"id": "file--abc"});
        let now = parse_timestamp("2020-01-01T00:00:00.000000Z").expect("valid");
        assert_eq!(determine_version(&body, now), now);
    }

    #[test]
    fn existing_meta_preserves_original_date_added_and_media_type() {
        let body = json!({"created": "2016-01-01T00:00:00.000000Z"});
        let existing = PersistedMeta {
            date_added: parse_timestamp("2016-01-01T00:00:00.100000Z").expect("valid"),
            media_type: "application/stix+json;version=2.0".to_string(),
        };
        let now = parse_timestamp("2020-01-01T00:00:00.000000Z").expect("valid");
        let meta = stamp(&body, Some(&existing), now, "application/stix+json;version=2.1");
        assert_eq!(meta.date_added, existing.date_added);
        assert_eq!(meta.media_type, existing.media_type);
    }
}
