//! The filter/query engine: matcher construction, version and spec-version
//! resolution, and sort/paginate.

pub mod coerce;
pub mod matchers;
pub mod tables;

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::entities::StixObject;
use crate::error::TaxiiError;
use crate::time::parse_timestamp;
pub use matchers::{PropMatcher, object_passes};
pub use tables::get_filter_info;

/// Build the sorted matcher plan for one request: recognized filters in
/// `filter_args` that are also in `allowed_filters`, sorted by speed tier so
/// cheap rejections run first.
pub fn build_matchers(
    filter_args: &HashMap<String, String>,
    allowed_filters: &[&str],
) -> Result<Vec<PropMatcher>, TaxiiError> {
    let mut plan = Vec::new();
    for name in allowed_filters {
        let Some(raw) = filter_args.get(*name) else {
            continue;
        };
        let Some(info) = get_filter_info(name) else {
            continue;
        };
        let values = raw
            .split(',')
            .map(str::trim)
            .map(|v| info.coercer.coerce(v))
            .collect::<Result<Vec<_>, _>>()?;
        plan.push(PropMatcher {
            name: (*name).to_string(),
            info,
            values,
        });
    }
    plan.sort_by_key(|m| m.info.tier);
    Ok(plan)
}

/// One selector within a `match[version]` query: `first`, `last`, or an exact
/// timestamp. Distinct from [`VersionFilter::All`], which short-circuits to
/// identity rather than selecting per `id` family.
#[derive(Debug, Clone, PartialEq, Eq)]
enum VersionSelector {
    First,
    Last,
    At(DateTime<Utc>),
}

/// Version filter semantics: `first|last|all|<timestamp>`, comma-separated
/// and unioned (e.g. `first,last`), default `last`. `all` short-circuits to
/// identity regardless of what else is present alongside it.
#[derive(Debug, Clone)]
pub enum VersionFilter {
    All,
    Selectors(Vec<VersionSelector>),
}

impl VersionFilter {
    pub fn parse(raw: Option<&str>) -> Result<Self, TaxiiError> {
        let Some(raw) = raw else {
            return Ok(Self::Selectors(vec![VersionSelector::Last]));
        };
        let mut selectors = Vec::new();
        for part in raw.split(',').map(str::trim) {
            match part {
                "first" => selectors.push(VersionSelector::First),
                "last" => selectors.push(VersionSelector::Last),
                "all" => return Ok(Self::All),
                other => {
                    let ts = parse_timestamp(other)
                        .map_err(|_| TaxiiError::BadRequest(format!("'{other}' is not a valid version filter")))?;
                    selectors.push(VersionSelector::At(ts));
                }
            }
        }
        Ok(Self::Selectors(selectors))
    }
}

/// Apply the version filter. Groups by `id`; within each group unions every
/// selector's picks (earliest/latest `version` and/or exact timestamp
/// matches), preserving each object at most once.
#[must_use]
pub fn apply_version_filter<'a>(objects: Vec<&'a StixObject>, filter: &VersionFilter) -> Vec<&'a StixObject> {
    let selectors = match filter {
        VersionFilter::All => return objects,
        VersionFilter::Selectors(selectors) => selectors,
    };

    let mut by_id: BTreeMap<&str, Vec<&StixObject>> = BTreeMap::new();
    for obj in objects {
        by_id.entry(obj.id()).or_default().push(obj);
    }

    let mut out = Vec::new();
    for (_, mut group) in by_id {
        group.sort_by_key(|o| o.meta.version);
        let mut picked: Vec<&StixObject> = Vec::new();
        for selector in selectors {
            match selector {
                VersionSelector::First => {
                    if let Some(first) = group.first() {
                        push_unique(&mut picked, first);
                    }
                }
                VersionSelector::Last => {
                    if let Some(last) = group.last() {
                        push_unique(&mut picked, last);
                    }
                }
                VersionSelector::At(ts) => {
                    for obj in group.iter().filter(|o| o.meta.version == *ts) {
                        push_unique(&mut picked, obj);
                    }
                }
            }
        }
        out.extend(picked);
    }
    out
}

fn push_unique<'a>(picked: &mut Vec<&'a StixObject>, candidate: &'a StixObject) {
    if !picked.iter().any(|o| std::ptr::eq(*o, candidate)) {
        picked.push(candidate);
    }
}

/// Apply the spec_version filter. When `wanted` is empty, retains every
/// record tied for the lexicographically-greatest `spec_version_tuple` per
/// `id` family (a tie keeps all of them, not just one); otherwise keeps
/// objects whose spec_version is in `wanted`.
#[must_use]
pub fn apply_spec_version_filter<'a>(objects: Vec<&'a StixObject>, wanted: &[String]) -> Vec<&'a StixObject> {
    if !wanted.is_empty() {
        return objects
            .into_iter()
            .filter(|o| wanted.iter().any(|w| w == &o.meta.spec_version))
            .collect();
    }

    let mut by_id: BTreeMap<&str, Vec<&StixObject>> = BTreeMap::new();
    for obj in objects {
        by_id.entry(obj.id()).or_default().push(obj);
    }

    let mut out = Vec::new();
    for (_, group) in by_id {
        let Some(max_tuple) = group.iter().map(|o| &o.meta.spec_version_tuple).max().cloned() else {
            continue;
        };
        out.extend(group.into_iter().filter(|o| o.meta.spec_version_tuple == max_tuple));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::Meta;
    use serde_json::json;

    fn obj(id: &str, version: DateTime<Utc>, spec_version: &str, spec_version_tuple: Vec<u32>) -> StixObject {
        StixObject {
            meta: Meta {
                date_added: version,
                media_type: "application/stix+json;version=2.1".to_string(),
                version,
                spec_version: spec_version.to_string(),
                spec_version_tuple,
            },
            body: json!({"id": id, "type": "indicator"}),
        }
    }

    #[test]
    fn spec_version_filter_keeps_all_objects_tied_for_the_max_tuple() {
        let t0 = Utc::now();
        let a = obj("indicator--1", t0, "2.1", vec![2, 1]);
        let b = obj("indicator--1", t0, "2.1", vec![2, 1]);
        let c = obj("indicator--1", t0, "2.1", vec![2, 1]);
        let objects = vec![&a, &b, &c];

        let kept = apply_spec_version_filter(objects, &[]);

        assert_eq!(kept.len(), 3, "a three-way tie on spec_version_tuple must keep all three records");
    }

    #[test]
    fn spec_version_filter_drops_strictly_older_tuples_within_an_id_family() {
        let t0 = Utc::now();
        let old = obj("indicator--1", t0, "2.0", vec![2, 0]);
        let newer = obj("indicator--1", t0, "2.1", vec![2, 1]);
        let objects = vec![&old, &newer];

        let kept = apply_spec_version_filter(objects, &[]);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].meta.spec_version, "2.1");
    }

    #[test]
    fn spec_version_filter_honors_an_explicit_wanted_list() {
        let t0 = Utc::now();
        let v20 = obj("indicator--1", t0, "2.0", vec![2, 0]);
        let v21 = obj("indicator--1", t0, "2.1", vec![2, 1]);
        let objects = vec![&v20, &v21];

        let kept = apply_spec_version_filter(objects, &["2.0".to_string()]);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].meta.spec_version, "2.0");
    }
}

/// Sort by `date_added` ascending (stable, preserving insertion order on
/// ties) and slice into `(page, remaining)` by `limit`.
#[must_use]
pub fn sort_and_paginate<'a>(mut objects: Vec<&'a StixObject>, limit: usize) -> (Vec<&'a StixObject>, Vec<&'a StixObject>) {
    objects.sort_by_key(|o| o.meta.date_added);
    if limit >= objects.len() {
        (objects, Vec::new())
    } else {
        let remaining = objects.split_off(limit);
        (objects, remaining)
    }
}

/// `X-TAXII-Date-Added-First`/`-Last` headers from a page, in *taxii* form.
#[must_use]
pub fn date_added_headers(page: &[&StixObject]) -> Option<(String, String)> {
    let first = page.first()?.meta.date_added;
    let last = page.last()?.meta.date_added;
    Some((crate::time::to_taxii_string(&first), crate::time::to_taxii_string(&last)))
}

/// Normalized paging-session filter arguments: every argument except
/// `limit`/`next`, comma-split, sorted, deduplicated.
#[must_use]
pub fn normalize_filter_args(filter_args: &HashMap<String, String>) -> BTreeMap<String, Vec<String>> {
    let mut out = BTreeMap::new();
    for (key, value) in filter_args {
        if key == "limit" || key == "next" {
            continue;
        }
        let mut parts: Vec<String> = value.split(',').map(|s| s.trim().to_string()).collect();
        parts.sort();
        out.insert(key.clone(), parts);
    }
    out
}
