//! Server configuration: JSON multi-file loading, deep merge, and a
//! process-global singleton.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TaxiiError;

const ENV_CONFIG_FILE: &str = "DARWIS_TAXII_CONFIG_FILE";
const ENV_CONFIG_DIR: &str = "DARWIS_TAXII_CONFIG_DIR";
const DEFAULT_CONFIG_FILE: &str = "/etc/darwis-taxii/config.json";
const DEFAULT_CONFIG_DIR: &str = "/etc/darwis-taxii/conf.d";

/// Server configuration, deserialized from the merged JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_pagination_limit")]
    pub default_pagination_limit: usize,
    #[serde(default = "default_max_pagination_limit")]
    pub max_pagination_limit: usize,
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: i64,
    #[serde(default = "default_session_sweep_interval_secs")]
    pub session_sweep_interval_secs: u64,
    #[serde(default = "default_status_retention_secs")]
    pub status_retention_secs: i64,
    #[serde(default = "default_status_sweep_interval_secs")]
    pub status_sweep_interval_secs: u64,
    /// Whether the background session/status expiry sweepers run. Disabling
    /// this does not exempt `status_retention_secs` from the interop floor.
    #[serde(default = "default_true")]
    pub run_cleanup_threads: bool,
    #[serde(default)]
    pub interop: bool,
    #[serde(default)]
    pub dataset_path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_pagination_limit() -> usize {
    100
}
fn default_max_pagination_limit() -> usize {
    1000
}
fn default_session_timeout_secs() -> i64 {
    300
}
fn default_session_sweep_interval_secs() -> u64 {
    10
}
fn default_status_retention_secs() -> i64 {
    86_400
}
fn default_status_sweep_interval_secs() -> u64 {
    60
}

impl ServerConfig {
    /// Load and merge config, respecting `DARWIS_TAXII_CONFIG_FILE`/`_CONFIG_DIR`.
    pub fn load() -> Result<Self, TaxiiError> {
        let conf_file = std::env::var(ENV_CONFIG_FILE).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let conf_dir = std::env::var(ENV_CONFIG_DIR).unwrap_or_else(|_| DEFAULT_CONFIG_DIR.to_string());
        let merged = load_and_merge(Path::new(&conf_file), Path::new(&conf_dir))?;
        let config: ServerConfig = serde_json::from_value(merged)?;
        config.validate()?;
        Ok(config)
    }

    /// Enforce the interop-mode invariants: background expiry must stay
    /// enabled, and status retention must be at least 24 hours.
    fn validate(&self) -> Result<(), TaxiiError> {
        if self.interop && !self.run_cleanup_threads {
            return Err(TaxiiError::Internal(
                "interop mode requires run_cleanup_threads to stay enabled".to_string(),
            ));
        }
        crate::status_store::validate_retention(chrono::Duration::seconds(self.status_retention_secs), self.interop)
            .map_err(TaxiiError::Internal)
    }

    /// Access the process-global configuration, initializing it on first use.
    pub fn global() -> Result<&'static Self, TaxiiError> {
        static CONFIG: OnceLock<Result<ServerConfig, String>> = OnceLock::new();
        static INIT_LOCK: Mutex<()> = Mutex::new(());

        if CONFIG.get().is_none() {
            let _guard = INIT_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let _ = CONFIG.get_or_init(|| Self::load().map_err(|e| e.to_string()));
        }

        match CONFIG.get() {
            Some(Ok(config)) => Ok(config),
            Some(Err(message)) => Err(TaxiiError::Internal(message.clone())),
            None => Err(TaxiiError::Internal("configuration not initialized".to_string())),
        }
    }
}

/// Load the single config file (if present) plus every `.json`/`.conf` file
/// in the config directory, sorted lexicographically by filename, merging
/// each deeply into the accumulator in order (later overrides earlier).
fn load_and_merge(conf_file: &Path, conf_dir: &Path) -> Result<Value, TaxiiError> {
    let mut accumulator = Value::Object(serde_json::Map::new());

    if let Some(data) = read_json_file(conf_file)? {
        accumulator = deep_merge(accumulator, data);
    }

    if let Ok(entries) = std::fs::read_dir(conf_dir) {
        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|ext| ext == "json" || ext == "conf")
            })
            .collect();
        files.sort();
        for file in files {
            if let Some(data) = read_json_file(&file)? {
                accumulator = deep_merge(accumulator, data);
            }
        }
    }

    Ok(accumulator)
}

fn read_json_file(path: &Path) -> Result<Option<Value>, TaxiiError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let value: Value = serde_json::from_str(&contents)?;
            if !value.is_object() {
                return Err(TaxiiError::Internal(format!(
                    "{} must contain a JSON object",
                    path.display()
                )));
            }
            Ok(Some(value))
        }
        Err(_) => Ok(None),
    }
}

/// Deep-merge `overlay` onto `base`: objects merge key-wise recursively,
/// any other value type in `overlay` replaces `base` outright.
fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// BTreeMap-keyed flattening helper used by `taxii dataset validate` to
/// report which top-level keys a merged config actually set.
#[must_use]
pub fn flatten_top_level_keys(value: &Value) -> BTreeMap<String, bool> {
    value
        .as_object()
        .map(|map| map.keys().map(|k| (k.clone(), true)).collect())
        .unwrap_or_default()
}
