//! Domain entities: discovery, API roots, collections, stored objects, and
//! status records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::meta::Meta;

/// Process-level discovery record, immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discovery {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub api_roots: Vec<String>,
}

/// Per-API-root information record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRootInfo {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub versions: Vec<String>,
    pub max_content_length: u64,
}

/// A named tenant-like namespace grouping collections and status resources.
#[derive(Debug, Clone)]
pub struct ApiRoot {
    pub name: String,
    pub information: ApiRootInfo,
    pub collections: std::collections::BTreeMap<String, Collection>,
    pub statuses: std::collections::BTreeMap<String, Status>,
}

/// An ordered set of objects with shared access flags and a media-type
/// whitelist.
#[derive(Debug, Clone)]
pub struct Collection {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub can_read: bool,
    pub can_write: bool,
    pub media_types: Vec<String>,
    /// Insertion-ordered; `date_added` is non-decreasing with this order.
    pub objects: Vec<StixObject>,
}

impl Collection {
    /// The wire-level summary (no `objects`).
    #[must_use]
    pub fn summary(&self) -> CollectionSummary {
        CollectionSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            can_read: self.can_read,
            can_write: self.can_write,
            media_types: self.media_types.clone(),
        }
    }

    /// Register `media_type` in the collection's whitelist if not already present.
    pub fn observe_media_type(&mut self, media_type: &str) {
        if !self.media_types.iter().any(|m| m == media_type) {
            self.media_types.push(media_type.to_string());
        }
    }
}

/// Wire-level projection of a [`Collection`] with `objects` omitted.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub can_read: bool,
    pub can_write: bool,
    pub media_types: Vec<String>,
}

/// A stored STIX-style object: its JSON body plus server-maintained [`Meta`].
#[derive(Debug, Clone)]
pub struct StixObject {
    pub meta: Meta,
    /// The full object body, including `id`/`type`/`spec_version` as
    /// ordinary top-level keys. Never carries the sidecar meta.
    pub body: serde_json::Value,
}

impl StixObject {
    #[must_use]
    pub fn id(&self) -> &str {
        self.body.get("id").and_then(serde_json::Value::as_str).unwrap_or("")
    }

    #[must_use]
    pub fn stix_type(&self) -> &str {
        self.body.get("type").and_then(serde_json::Value::as_str).unwrap_or("")
    }

    /// A manifest projection of this object.
    #[must_use]
    pub fn to_manifest_entry(&self) -> ManifestEntry {
        ManifestEntry {
            id: self.id().to_string(),
            date_added: self.meta.date_added,
            version: self.meta.version,
            media_type: self.meta.media_type.clone(),
        }
    }
}

/// One entry in a manifest resource.
#[derive(Debug, Clone)]
pub struct ManifestEntry {
    pub id: String,
    pub date_added: DateTime<Utc>,
    pub version: DateTime<Utc>,
    pub media_type: String,
}

/// Lifecycle state of a [`Status`] record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Complete,
    Pending,
}

/// A single success/failure/pending entry within a [`Status`] record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusDetail {
    pub id: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// An asynchronous add-objects status resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub id: String,
    pub status: StatusKind,
    pub request_timestamp: DateTime<Utc>,
    pub successes: Vec<StatusDetail>,
    pub failures: Vec<StatusDetail>,
    pub pendings: Vec<StatusDetail>,
}

impl Status {
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pendings.len()
    }

    #[must_use]
    pub fn total_count(&self) -> usize {
        self.success_count() + self.failure_count() + self.pending_count()
    }
}
