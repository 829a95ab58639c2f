//! Per-API-root status record store and retention sweeper.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::entities::Status;

/// Minimum status retention when interop mode is enabled.
pub const MIN_INTEROP_RETENTION: Duration = Duration::hours(24);

/// Per-API-root map of status-id to [`Status`] record.
#[derive(Debug, Default)]
pub struct StatusStore {
    statuses: BTreeMap<String, Status>,
}

impl StatusStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, status: Status) {
        self.statuses.insert(status.id.clone(), status);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Status> {
        self.statuses.get(id)
    }

    /// Remove every status whose `now - request_timestamp > retention`.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>, retention: Duration) {
        self.statuses.retain(|_, s| now - s.request_timestamp <= retention);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

/// Validate a configured retention against the interop floor. Startup must
/// fail if interop mode is on and retention is below 24h — regardless of
/// whether background expiry itself is enabled, since disabling the sweeper
/// does not exempt the configuration from the floor.
pub fn validate_retention(retention: Duration, interop_enabled: bool) -> Result<(), String> {
    if interop_enabled && retention < MIN_INTEROP_RETENTION {
        return Err(format!(
            "status_retention must be at least 24 hours when interop mode is enabled, got {retention}"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::StatusKind;

    fn status(id: &str, ts: DateTime<Utc>) -> Status {
        Status {
            id: id.to_string(),
            status: StatusKind::Complete,
            request_timestamp: ts,
            successes: Vec::new(),
            failures: Vec::new(),
            pendings: Vec::new(),
        }
    }

    #[test]
    fn sweep_removes_only_expired_statuses() {
        let mut store = StatusStore::new();
        let now = Utc::now();
        store.insert(status("fresh", now));
        store.insert(status("stale", now - Duration::hours(25)));

        store.sweep_expired(now, Duration::hours(24));

        assert!(store.get("fresh").is_some());
        assert!(store.get("stale").is_none());
    }

    #[test]
    fn interop_requires_24h_retention_even_when_sweeper_disabled() {
        assert!(validate_retention(Duration::hours(1), true).is_err());
        assert!(validate_retention(Duration::hours(1), false).is_ok());
        assert!(validate_retention(Duration::hours(24), true).is_ok());
    }
}
