//! The reference in-process [`Backend`] implementation.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use taxii_core::backend::{Backend, FilterArgs, Page};
use taxii_core::entities::{ApiRoot, ApiRootInfo, Collection, CollectionSummary, Discovery, ManifestEntry, Status, StatusDetail, StatusKind, StixObject};
use taxii_core::error::{TaxiiError, TaxiiResult};
use taxii_core::filter::{VersionFilter, apply_spec_version_filter, apply_version_filter, build_matchers, object_passes, sort_and_paginate};
use taxii_core::meta::stamp;
use taxii_core::paging::PagingSessionStore;

/// Default `limit` applied when the HTTP layer did not supply one.
const FALLBACK_LIMIT: usize = 100;

struct MemoryState {
    discovery: Option<Discovery>,
    api_roots: BTreeMap<String, ApiRoot>,
    paging: PagingSessionStore,
}

/// The in-memory reference backend: a single owning tree guarded by one
/// mutex. Every request is a critical section, matching the reference
/// backend's documented concurrency model.
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new(discovery: Option<Discovery>, api_roots: BTreeMap<String, ApiRoot>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                discovery,
                api_roots,
                paging: PagingSessionStore::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Remove paging sessions idle longer than `timeout`.
    pub fn sweep_expired_sessions(&self, now: DateTime<Utc>, timeout: chrono::Duration) {
        self.lock().paging.sweep_expired(now, timeout);
    }

    /// Remove status records older than `retention`, across every API root.
    pub fn sweep_expired_statuses(&self, now: DateTime<Utc>, retention: chrono::Duration) {
        let mut guard = self.lock();
        for root in guard.api_roots.values_mut() {
            root.statuses.retain(|_, s| now - s.request_timestamp <= retention);
        }
    }

    /// Snapshot the full dataset for persistence.
    pub fn snapshot(&self) -> (Option<Discovery>, BTreeMap<String, ApiRoot>) {
        let guard = self.lock();
        (guard.discovery.clone(), guard.api_roots.clone())
    }
}

fn spec_version_set(filter: &FilterArgs) -> Vec<String> {
    filter
        .raw
        .get("spec_version")
        .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or_default()
}

fn effective_limit(filter: &FilterArgs) -> usize {
    filter.limit.unwrap_or(FALLBACK_LIMIT)
}

impl Backend for MemoryBackend {
    async fn server_discovery(&self) -> TaxiiResult<Option<Discovery>> {
        Ok(self.lock().discovery.clone())
    }

    async fn get_api_root_information(&self, api_root: &str) -> TaxiiResult<Option<ApiRootInfo>> {
        Ok(self.lock().api_roots.get(api_root).map(|r| r.information.clone()))
    }

    async fn get_collections(&self, api_root: &str) -> TaxiiResult<Option<Vec<CollectionSummary>>> {
        Ok(self
            .lock()
            .api_roots
            .get(api_root)
            .map(|r| r.collections.values().map(Collection::summary).collect()))
    }

    async fn get_collection(&self, api_root: &str, id: &str) -> TaxiiResult<Option<CollectionSummary>> {
        Ok(self
            .lock()
            .api_roots
            .get(api_root)
            .and_then(|r| r.collections.get(id))
            .map(Collection::summary))
    }

    async fn get_object_manifest(
        &self,
        api_root: &str,
        id: &str,
        filter: &FilterArgs,
        allowed_filters: &'static [&'static str],
    ) -> TaxiiResult<Option<Page<ManifestEntry>>> {
        let Some(page) = self.get_objects(api_root, id, filter, allowed_filters).await? else {
            return Ok(None);
        };
        Ok(Some(Page {
            items: page.items.iter().map(StixObject::to_manifest_entry).collect(),
            more: page.more,
            next: page.next,
        }))
    }

    async fn get_objects(
        &self,
        api_root: &str,
        id: &str,
        filter: &FilterArgs,
        allowed_filters: &'static [&'static str],
    ) -> TaxiiResult<Option<Page<StixObject>>> {
        let limit = effective_limit(filter);
        let now = Utc::now();

        if let Some(key) = &filter.next {
            let mut guard = self.lock();
            if !guard.api_roots.get(api_root).is_some_and(|r| r.collections.contains_key(id)) {
                return Ok(None);
            }
            if limit == 0 {
                return Ok(Some(Page { items: Vec::new(), more: false, next: None }));
            }
            let (items, more, next) = guard.paging.take(key, &filter.raw, limit, now)?;
            return Ok(Some(Page { items, more, next }));
        }

        let guard = self.lock();
        let Some(collection) = guard.api_roots.get(api_root).and_then(|r| r.collections.get(id)) else {
            return Ok(None);
        };

        if limit == 0 {
            return Ok(Some(Page { items: Vec::new(), more: false, next: None }));
        }

        let matchers = build_matchers(&filter.raw, allowed_filters)?;
        let matched: Vec<&StixObject> = collection.objects.iter().filter(|o| object_passes(o, &matchers)).collect();

        let version_filter = VersionFilter::parse(filter.raw.get("version").map(String::as_str))?;
        let versioned = apply_version_filter(matched, &version_filter);
        let spec_wanted = spec_version_set(filter);
        let spec_filtered = apply_spec_version_filter(versioned, &spec_wanted);

        let (page, remaining) = sort_and_paginate(spec_filtered, limit);
        let page: Vec<StixObject> = page.into_iter().cloned().collect();
        let remaining: Vec<StixObject> = remaining.into_iter().cloned().collect();

        drop(guard);

        let (more, next) = if remaining.is_empty() {
            (false, None)
        } else {
            let mut guard = self.lock();
            let key = guard.paging.create(remaining, &filter.raw, now);
            (true, Some(key))
        };

        Ok(Some(Page { items: page, more, next }))
    }

    async fn get_object(
        &self,
        api_root: &str,
        id: &str,
        object_id: &str,
        filter: &FilterArgs,
        allowed_filters: &'static [&'static str],
    ) -> TaxiiResult<Page<StixObject>> {
        {
            let guard = self.lock();
            let exists = guard
                .api_roots
                .get(api_root)
                .and_then(|r| r.collections.get(id))
                .is_some_and(|c| c.objects.iter().any(|o| o.id() == object_id));
            if !exists {
                return Err(TaxiiError::NotFound(format!("object '{object_id}' not found")));
            }
        }

        let mut scoped = filter.clone();
        scoped.raw.insert("id".to_string(), object_id.to_string());

        match self.get_objects(api_root, id, &scoped, allowed_filters).await? {
            Some(page) => Ok(page),
            None => Err(TaxiiError::NotFound(format!("collection '{id}' not found"))),
        }
    }

    async fn get_object_versions(
        &self,
        api_root: &str,
        id: &str,
        object_id: &str,
        filter: &FilterArgs,
        allowed_filters: &'static [&'static str],
    ) -> TaxiiResult<Page<DateTime<Utc>>> {
        let mut scoped = filter.clone();
        scoped.raw.insert("version".to_string(), "all".to_string());
        let page = self.get_object(api_root, id, object_id, &scoped, allowed_filters).await?;
        Ok(Page {
            items: page.items.iter().map(|o| o.meta.version).collect(),
            more: page.more,
            next: page.next,
        })
    }

    async fn add_objects(
        &self,
        api_root: &str,
        id: &str,
        envelope: serde_json::Value,
        request_time: DateTime<Utc>,
    ) -> TaxiiResult<Status> {
        let objects = envelope
            .get("objects")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| TaxiiError::UnprocessableEntity("envelope must contain an 'objects' array".to_string()))?
            .clone();

        let mut successes = Vec::new();
        let mut failures = Vec::new();

        let mut guard = self.lock();
        let collection = guard
            .api_roots
            .get_mut(api_root)
            .and_then(|r| r.collections.get_mut(id))
            .ok_or_else(|| TaxiiError::NotFound(format!("collection '{id}' not found")))?;

        for body in objects {
            if !body.is_object() {
                failures.push(StatusDetail {
                    id: "<unknown id>".to_string(),
                    version: "<unknown version>".to_string(),
                    message: Some("object is not a JSON object".to_string()),
                });
                continue;
            }

            let obj_id = body
                .get("id")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("<unknown id>")
                .to_string();

            let spec_version = taxii_core::meta::determine_spec_version(&body);
            let default_media_type = format!("application/stix+json;version={spec_version}");
            let meta = stamp(&body, None, request_time, &default_media_type);
            let version_str = taxii_core::time::to_taxii_string(&meta.version);

            let already_present = collection
                .objects
                .iter()
                .any(|existing| existing.id() == obj_id && existing.meta.version == meta.version);

            if already_present {
                successes.push(StatusDetail {
                    id: obj_id,
                    version: version_str,
                    message: Some("Object already added".to_string()),
                });
                continue;
            }

            collection.observe_media_type(&meta.media_type);
            collection.objects.push(StixObject { meta, body });
            successes.push(StatusDetail {
                id: obj_id,
                version: version_str,
                message: None,
            });
        }

        let status = Status {
            id: uuid::Uuid::new_v4().to_string(),
            status: StatusKind::Complete,
            request_timestamp: request_time,
            successes,
            failures,
            pendings: Vec::new(),
        };

        guard
            .api_roots
            .get_mut(api_root)
            .map(|r| r.statuses.insert(status.id.clone(), status.clone()));

        Ok(status)
    }

    async fn delete_object(
        &self,
        api_root: &str,
        id: &str,
        object_id: &str,
        filter: &FilterArgs,
        allowed_filters: &'static [&'static str],
    ) -> TaxiiResult<()> {
        let mut scoped = filter.raw.clone();
        scoped.insert("id".to_string(), object_id.to_string());
        let matchers = build_matchers(&scoped, allowed_filters)?;
        let version_filter = VersionFilter::parse(scoped.get("version").map(String::as_str))?;
        let spec_wanted = spec_version_set(filter);

        let mut guard = self.lock();
        let collection = guard
            .api_roots
            .get_mut(api_root)
            .and_then(|r| r.collections.get_mut(id))
            .ok_or_else(|| TaxiiError::NotFound(format!("collection '{id}' not found")))?;

        if !collection.objects.iter().any(|o| o.id() == object_id) {
            return Err(TaxiiError::NotFound(format!("object '{object_id}' not found")));
        }

        // Mirror the reference backend: existence is checked on the bare
        // object id before filters are applied, so a filter that matches
        // nothing deletes nothing without that being an error.
        let doomed: std::collections::HashSet<(String, DateTime<Utc>)> = {
            let matched: Vec<&StixObject> = collection.objects.iter().filter(|o| object_passes(o, &matchers)).collect();
            let versioned = apply_version_filter(matched, &version_filter);
            apply_spec_version_filter(versioned, &spec_wanted)
                .into_iter()
                .map(|o| (o.id().to_string(), o.meta.version))
                .collect()
        };

        collection
            .objects
            .retain(|o| !doomed.contains(&(o.id().to_string(), o.meta.version)));
        Ok(())
    }

    async fn get_status(&self, api_root: &str, status_id: &str) -> TaxiiResult<Option<Status>> {
        Ok(self
            .lock()
            .api_roots
            .get(api_root)
            .and_then(|r| r.statuses.get(status_id))
            .cloned())
    }
}
