//! JSON load/save of the full dataset.
//!
//! Layout: one document with a `/discovery` key carrying the discovery
//! record, and one key per API root name (API roots are not nested under a
//! wrapper key). Each stored object carries a `__meta` sub-object with
//! `{date_added, media_type}`; `version` and `spec_version_tuple` are
//! re-derived on load, never persisted.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use taxii_core::entities::{ApiRoot, ApiRootInfo, Collection, Discovery, Status};
use taxii_core::error::{TaxiiError, TaxiiResult};
use taxii_core::meta::{PersistedMeta, stamp};

const META_KEY: &str = "__meta";
const DISCOVERY_KEY: &str = "/discovery";

#[derive(Debug, Serialize, Deserialize)]
struct FileCollection {
    id: String,
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    can_read: bool,
    can_write: bool,
    media_types: Vec<String>,
    objects: Vec<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FileApiRoot {
    information: ApiRootInfo,
    collections: BTreeMap<String, FileCollection>,
    status: BTreeMap<String, Status>,
}

/// Load a dataset from `path`. Missing files are treated as an empty dataset.
pub fn load(path: &Path) -> TaxiiResult<(Option<Discovery>, BTreeMap<String, ApiRoot>)> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Ok((None, BTreeMap::new())),
    };
    let document: BTreeMap<String, Value> = serde_json::from_str(&contents)?;

    let discovery = document
        .get(DISCOVERY_KEY)
        .map(|v| serde_json::from_value(v.clone()))
        .transpose()?;

    let mut api_roots = BTreeMap::new();
    for (name, value) in document {
        if name == DISCOVERY_KEY {
            continue;
        }
        let file_root: FileApiRoot = serde_json::from_value(value)?;
        api_roots.insert(name.clone(), decode_api_root(name, file_root)?);
    }

    Ok((discovery, api_roots))
}

fn decode_api_root(name: String, file_root: FileApiRoot) -> TaxiiResult<ApiRoot> {
    let mut collections = BTreeMap::new();
    for (id, file_collection) in file_root.collections {
        let mut objects = Vec::new();
        for mut body in file_collection.objects {
            let meta_value = body
                .as_object_mut()
                .and_then(|m| m.remove(META_KEY))
                .ok_or_else(|| TaxiiError::Internal(format!("object missing {META_KEY} on load")))?;
            let persisted: PersistedMeta = serde_json::from_value(meta_value)?;
            let meta = stamp(&body, Some(&persisted), Utc::now(), &persisted.media_type);
            objects.push(taxii_core::entities::StixObject { meta, body });
        }
        collections.insert(
            id.clone(),
            Collection {
                id: file_collection.id,
                title: file_collection.title,
                description: file_collection.description,
                can_read: file_collection.can_read,
                can_write: file_collection.can_write,
                media_types: file_collection.media_types,
                objects,
            },
        );
    }

    Ok(ApiRoot {
        name,
        information: file_root.information,
        collections,
        statuses: file_root.status,
    })
}

/// Save a dataset to `path` as pretty-printed JSON.
pub fn save(path: &Path, discovery: Option<&Discovery>, api_roots: &BTreeMap<String, ApiRoot>) -> TaxiiResult<()> {
    let mut document = serde_json::Map::new();
    if let Some(discovery) = discovery {
        document.insert(DISCOVERY_KEY.to_string(), serde_json::to_value(discovery)?);
    }

    for (name, root) in api_roots {
        let mut collections = BTreeMap::new();
        for (id, collection) in &root.collections {
            let objects = collection
                .objects
                .iter()
                .map(|obj| {
                    let mut body = obj.body.clone();
                    if let Some(map) = body.as_object_mut() {
                        map.insert(META_KEY.to_string(), serde_json::to_value(obj.meta.to_persisted())?);
                    }
                    Ok(body)
                })
                .collect::<TaxiiResult<Vec<Value>>>()?;

            collections.insert(
                id.clone(),
                FileCollection {
                    id: collection.id.clone(),
                    title: collection.title.clone(),
                    description: collection.description.clone(),
                    can_read: collection.can_read,
                    can_write: collection.can_write,
                    media_types: collection.media_types.clone(),
                    objects,
                },
            );
        }

        let file_root = FileApiRoot {
            information: root.information.clone(),
            collections,
            status: root.statuses.clone(),
        };
        document.insert(name.clone(), serde_json::to_value(file_root)?);
    }

    let rendered = serde_json::to_string_pretty(&Value::Object(document))?;
    std::fs::write(path, rendered).map_err(|e| TaxiiError::Internal(format!("failed to write {}: {e}", path.display())))?;
    Ok(())
}
