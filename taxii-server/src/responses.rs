//! Wire-level response bodies for TAXII resources.

use serde::Serialize;
use serde_json::Value;

use taxii_core::entities::CollectionSummary;

#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub api_roots: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiRootResponse {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub versions: Vec<String>,
    pub max_content_length: u64,
}

#[derive(Debug, Serialize)]
pub struct CollectionsResponse {
    pub collections: Vec<CollectionSummary>,
}

#[derive(Debug, Serialize)]
pub struct ManifestResponseEntry {
    pub id: String,
    pub date_added: String,
    pub version: String,
    pub media_type: String,
}

#[derive(Debug, Serialize)]
pub struct ManifestResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub more: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<ManifestResponseEntry>>,
}

#[derive(Debug, Serialize)]
pub struct ObjectsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub more: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
pub struct VersionsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub more: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versions: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub id: String,
    pub status: &'static str,
    pub request_timestamp: String,
    pub success_count: usize,
    pub failure_count: usize,
    pub pending_count: usize,
    pub total_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub successes: Vec<StatusDetailResponse>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<StatusDetailResponse>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pendings: Vec<StatusDetailResponse>,
}

#[derive(Debug, Serialize)]
pub struct StatusDetailResponse {
    pub id: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
