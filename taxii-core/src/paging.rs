//! Server-side paging session store: opaque key to remaining-results record.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entities::StixObject;
use crate::error::TaxiiError;
use crate::filter::normalize_filter_args;

/// One paging session: the unconsumed tail of a filtered, sorted read.
#[derive(Debug, Clone)]
pub struct PagingSession {
    pub remaining: Vec<StixObject>,
    pub args: BTreeMap<String, Vec<String>>,
    pub request_time: DateTime<Utc>,
}

/// In-memory map of opaque session key to [`PagingSession`], with idle-timeout
/// expiry.
#[derive(Debug, Default)]
pub struct PagingSessionStore {
    sessions: HashMap<String, PagingSession>,
}

impl PagingSessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new session for a non-empty `remaining` slice, returning its key.
    pub fn create(&mut self, remaining: Vec<StixObject>, filter_args: &HashMap<String, String>, now: DateTime<Utc>) -> String {
        let key = Uuid::new_v4().to_string();
        self.sessions.insert(
            key.clone(),
            PagingSession {
                remaining,
                args: normalize_filter_args(filter_args),
                request_time: now,
            },
        );
        key
    }

    /// Resolve `key` against `filter_args`, rejecting on an unknown key or on
    /// parameter drift from the originally recorded set.
    pub fn resolve(&mut self, key: &str, filter_args: &HashMap<String, String>) -> Result<Vec<StixObject>, TaxiiError> {
        let session = self
            .sessions
            .remove(key)
            .ok_or_else(|| TaxiiError::BadRequest("'next' not valid".to_string()))?;

        let incoming = normalize_filter_args(filter_args);
        if incoming != session.args {
            return Err(TaxiiError::BadRequest(
                "params changed over subsequent transaction".to_string(),
            ));
        }
        Ok(session.remaining)
    }

    /// Take up to `limit` objects from `key`'s session, re-inserting the
    /// session (with the same key) if objects remain, deleting it otherwise.
    ///
    /// Returns `(page, more, next_key)`.
    pub fn take(
        &mut self,
        key: &str,
        filter_args: &HashMap<String, String>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<(Vec<StixObject>, bool, Option<String>), TaxiiError> {
        let mut remaining = self.resolve(key, filter_args)?;
        if limit >= remaining.len() {
            return Ok((remaining, false, None));
        }
        let rest = remaining.split_off(limit);
        let more = !rest.is_empty();
        if more {
            self.sessions.insert(
                key.to_string(),
                PagingSession {
                    remaining: rest,
                    args: normalize_filter_args(filter_args),
                    request_time: now,
                },
            );
        }
        Ok((remaining, more, more.then(|| key.to_string())))
    }

    /// Remove every session whose `now - request_time > timeout`.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>, timeout: chrono::Duration) {
        self.sessions.retain(|_, s| now - s.request_time <= timeout);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::Meta;
    use serde_json::json;

    fn obj(id: &str, date_added: DateTime<Utc>) -> StixObject {
        StixObject {
            meta: Meta {
                date_added,
                media_type: "application/stix+json;version=2.1".to_string(),
                version: date_added,
                spec_version: "2.1".to_string(),
                spec_version_tuple: vec![2, 1],
            },
            body: json!({"id": id, "type": "indicator"}),
        }
    }

    #[test]
    fn rejects_unknown_key() {
        let mut store = PagingSessionStore::new();
        let args = HashMap::new();
        let err = store.resolve("missing", &args).expect_err("should reject");
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn rejects_param_drift() {
        let mut store = PagingSessionStore::new();
        let now = Utc::now();
        let mut original_args = HashMap::new();
        original_args.insert("match[version]".to_string(), "all".to_string());
        let key = store.create(vec![obj("indicator--a", now)], &original_args, now);

        let mut changed_args = HashMap::new();
        changed_args.insert("match[version]".to_string(), "first".to_string());
        let err = store.resolve(&key, &changed_args).expect_err("should reject");
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn take_consumes_and_reinserts_until_exhausted() {
        let mut store = PagingSessionStore::new();
        let now = Utc::now();
        let args = HashMap::new();
        let objects = vec![obj("a", now), obj("b", now), obj("c", now)];
        let key = store.create(objects, &args, now);

        let (page, more, next) = store.take(&key, &args, 2, now).expect("resolves");
        assert_eq!(page.len(), 2);
        assert!(more);
        assert_eq!(next, Some(key.clone()));

        let (page, more, next) = store.take(&key, &args, 2, now).expect("resolves");
        assert_eq!(page.len(), 1);
        assert!(!more);
        assert_eq!(next, None);
        assert!(store.is_empty());
    }
}
