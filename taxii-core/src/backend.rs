//! The polymorphic storage contract consumed by the HTTP layer.

use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Utc};

use crate::entities::{ApiRootInfo, CollectionSummary, Discovery, ManifestEntry, Status, StixObject};
use crate::error::TaxiiResult;

/// The result of a filtered, paginated read: the page itself, whether more
/// results remain, and the opaque key to fetch them with if so.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub more: bool,
    pub next: Option<String>,
}

/// The full set of recognized query-string parameters for a filtered read,
/// as received from the HTTP layer (bare property name, not `match[...]`).
#[derive(Debug, Clone, Default)]
pub struct FilterArgs {
    pub raw: HashMap<String, String>,
    pub next: Option<String>,
    pub limit: Option<usize>,
}

/// The polymorphic backend contract. Any implementation must be
/// indistinguishable, under these operations, from the reference in-process
/// backend — modulo storage-engine-native filter pushdown.
pub trait Backend: Send + Sync {
    fn server_discovery(&self) -> impl Future<Output = TaxiiResult<Option<Discovery>>> + Send;

    fn get_api_root_information(&self, api_root: &str) -> impl Future<Output = TaxiiResult<Option<ApiRootInfo>>> + Send;

    fn get_collections(&self, api_root: &str) -> impl Future<Output = TaxiiResult<Option<Vec<CollectionSummary>>>> + Send;

    fn get_collection(&self, api_root: &str, id: &str) -> impl Future<Output = TaxiiResult<Option<CollectionSummary>>> + Send;

    fn get_object_manifest(
        &self,
        api_root: &str,
        id: &str,
        filter: &FilterArgs,
        allowed_filters: &'static [&'static str],
    ) -> impl Future<Output = TaxiiResult<Option<Page<ManifestEntry>>>> + Send;

    fn get_objects(
        &self,
        api_root: &str,
        id: &str,
        filter: &FilterArgs,
        allowed_filters: &'static [&'static str],
    ) -> impl Future<Output = TaxiiResult<Option<Page<StixObject>>>> + Send;

    /// Fails with `NotFound` if `object_id` is absent from the collection,
    /// even when the filter would otherwise yield an empty page.
    fn get_object(
        &self,
        api_root: &str,
        id: &str,
        object_id: &str,
        filter: &FilterArgs,
        allowed_filters: &'static [&'static str],
    ) -> impl Future<Output = TaxiiResult<Page<StixObject>>> + Send;

    fn get_object_versions(
        &self,
        api_root: &str,
        id: &str,
        object_id: &str,
        filter: &FilterArgs,
        allowed_filters: &'static [&'static str],
    ) -> impl Future<Output = TaxiiResult<Page<DateTime<Utc>>>> + Send;

    fn add_objects(
        &self,
        api_root: &str,
        id: &str,
        envelope: serde_json::Value,
        request_time: DateTime<Utc>,
    ) -> impl Future<Output = TaxiiResult<Status>> + Send;

    /// Fails with `NotFound` if no object matches `object_id`.
    fn delete_object(
        &self,
        api_root: &str,
        id: &str,
        object_id: &str,
        filter: &FilterArgs,
        allowed_filters: &'static [&'static str],
    ) -> impl Future<Output = TaxiiResult<()>> + Send;

    fn get_status(&self, api_root: &str, status_id: &str) -> impl Future<Output = TaxiiResult<Option<Status>>> + Send;
}

/// Filter names the objects/manifest/object/versions/delete endpoints accept,
/// drawn from the closed table in [`crate::filter::tables`].
pub const OBJECTS_ALLOWED_FILTERS: &[&str] = &[
    "id", "type", "spec_version", "version", "added_after",
    "account_type", "confidence", "context", "data_type", "dst_port", "encryption_algorithm",
    "identity_class", "name", "number", "opinion", "pattern", "pattern_type", "primary_motivation",
    "region", "relationship_type", "resource_level", "result", "revoked", "src_port",
    "sophistication", "subject", "value",
    "aliases", "architecture_execution_envs", "capabilities", "extension_types",
    "implementation_languages", "indicator_types", "infrastructure_types", "labels",
    "malware_types", "personal_motivations", "report_types", "roles", "secondary_motivations",
    "sectors", "threat_actor_types", "tool_types",
    "address_family", "external_id", "MD5", "SHA-1", "SHA-256", "SHA-512", "SHA3-256", "SHA3-512",
    "SSDEEP", "TLSH", "integrity_level", "pe_type", "phase_name", "service_status", "service_type",
    "socket_type", "source_name", "start_type", "tlp", "relationships-all",
    "confidence-gte", "confidence-lte", "modified-gte", "modified-lte", "number-gte", "number-lte",
    "src_port-gte", "src_port-lte", "dst_port-gte", "dst_port-lte", "valid_until-gte", "valid_from-lte",
];
