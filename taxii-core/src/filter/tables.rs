//! The closed table of recognized filter names, their speed tier, matcher
//! kind, and value coercer. Grounded on medallion's `filters/common.py`.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::coerce::{CoercedValue, Coercer};

/// How a filter property is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    /// A fixed, always-present-shape top-level property.
    TopLevel,
    /// A property that may appear nested anywhere in the object tree.
    SubProperty,
    /// The `tlp` pseudo-property.
    Tlp,
    /// The `relationships-all` pseudo-property (`*_ref`/`*_refs` union).
    RelationshipsAll,
    /// A `<prop>-gte`/`<prop>-lte` numeric or timestamp comparison.
    Calculation(CalcOp),
}

/// Comparison direction for a [`MatcherKind::Calculation`] filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcOp {
    Gte,
    Lte,
}

/// Evaluation order tier; lower tiers run first so cheap rejections
/// short-circuit before expensive nested traversals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SpeedTier {
    /// Fixed top-level properties, plus `added_after`.
    Tier1,
    /// List-valued top-level properties.
    Tier2,
    /// Nested, reference, calculation, and TLP properties.
    Tier3,
}

/// A recognized filter name's static description.
#[derive(Debug, Clone)]
pub struct FilterInfo {
    pub tier: SpeedTier,
    pub kind: MatcherKind,
    pub coercer: Coercer,
    /// The actual object property this filter name reads, when it differs
    /// from the filter name itself (only `<prop>-gte`/`-lte` differ).
    pub property: &'static str,
    /// The value a `TopLevel` matcher treats an absent property as carrying
    /// (e.g. `revoked` defaults to `false`). `None` means a missing property
    /// never matches.
    pub default: Option<CoercedValue>,
}

/// `BUILTIN_PROPERTIES`: defined by the TAXII spec itself. `version`,
/// `spec_version`, and `added_after` are handled as special cases elsewhere
/// and are deliberately absent here.
const BUILTIN_STRING_PROPS: &[&str] = &["id", "type"];

/// `TIER_1_PROPERTIES`: simple top-level properties.
const TIER_1_STRING_PROPS: &[&str] = &[
    "account_type",
    "context",
    "data_type",
    "encryption_algorithm",
    "identity_class",
    "name",
    "opinion",
    "pattern",
    "pattern_type",
    "primary_motivation",
    "region",
    "relationship_type",
    "resource_level",
    "result",
    "sophistication",
    "subject",
    "value",
];
const TIER_1_BOOL_PROPS: &[&str] = &["revoked"];
const TIER_1_INT_PROPS: &[&str] = &["confidence", "dst_port", "number", "src_port"];

/// `TIER_2_PROPERTIES`: array-valued (list) top-level properties.
const TIER_2_STRING_PROPS: &[&str] = &[
    "aliases",
    "architecture_execution_envs",
    "capabilities",
    "extension_types",
    "implementation_languages",
    "indicator_types",
    "infrastructure_types",
    "labels",
    "malware_types",
    "personal_motivations",
    "report_types",
    "roles",
    "secondary_motivations",
    "sectors",
    "threat_actor_types",
    "tool_types",
];

/// `TIER_3_PROPERTIES`: properties defined within nested structures.
/// `tlp` is handled separately below via [`MatcherKind::Tlp`].
const TIER_3_STRING_PROPS: &[&str] = &[
    "address_family",
    "external_id",
    "MD5",
    "SHA-1",
    "SHA-256",
    "SHA-512",
    "SHA3-256",
    "SHA3-512",
    "SSDEEP",
    "TLSH",
    "integrity_level",
    "pe_type",
    "phase_name",
    "service_status",
    "service_type",
    "socket_type",
    "source_name",
    "start_type",
];

const CALCULATION_FIELDS: &[(&str, &str, CalcOp, Coercer)] = &[
    ("confidence-gte", "confidence", CalcOp::Gte, Coercer::Integer),
    ("confidence-lte", "confidence", CalcOp::Lte, Coercer::Integer),
    ("modified-gte", "modified", CalcOp::Gte, Coercer::Timestamp),
    ("modified-lte", "modified", CalcOp::Lte, Coercer::Timestamp),
    ("number-gte", "number", CalcOp::Gte, Coercer::Integer),
    ("number-lte", "number", CalcOp::Lte, Coercer::Integer),
    ("src_port-gte", "src_port", CalcOp::Gte, Coercer::Integer),
    ("src_port-lte", "src_port", CalcOp::Lte, Coercer::Integer),
    ("dst_port-gte", "dst_port", CalcOp::Gte, Coercer::Integer),
    ("dst_port-lte", "dst_port", CalcOp::Lte, Coercer::Integer),
    ("valid_until-gte", "valid_until", CalcOp::Gte, Coercer::Timestamp),
    ("valid_from-lte", "valid_from", CalcOp::Lte, Coercer::Timestamp),
];

fn build_table() -> HashMap<&'static str, FilterInfo> {
    let mut table = HashMap::new();

    let mut insert = |name: &'static str, tier: SpeedTier, kind: MatcherKind, coercer: Coercer| {
        table.insert(
            name,
            FilterInfo {
                tier,
                kind,
                coercer,
                property: name,
                default: None,
            },
        );
    };

    for &p in BUILTIN_STRING_PROPS {
        insert(p, SpeedTier::Tier1, MatcherKind::TopLevel, Coercer::String);
    }

    for &p in TIER_1_STRING_PROPS {
        insert(p, SpeedTier::Tier1, MatcherKind::TopLevel, Coercer::String);
    }
    // `revoked` (the sole tier-1 bool property) is absent from most STIX
    // objects; a missing `revoked` reads as `false`, matching the oracle's
    // `TopLevelPropertyMatcher(default_value=False)`.
    for &p in TIER_1_BOOL_PROPS {
        table.insert(
            p,
            FilterInfo {
                tier: SpeedTier::Tier1,
                kind: MatcherKind::TopLevel,
                coercer: Coercer::Boolean,
                property: p,
                default: Some(CoercedValue::Bool(false)),
            },
        );
    }
    for &p in TIER_1_INT_PROPS {
        insert(p, SpeedTier::Tier1, MatcherKind::TopLevel, Coercer::Integer);
    }
    insert("added_after", SpeedTier::Tier1, MatcherKind::TopLevel, Coercer::Timestamp);

    for &p in TIER_2_STRING_PROPS {
        insert(p, SpeedTier::Tier2, MatcherKind::TopLevel, Coercer::String);
    }

    for &p in TIER_3_STRING_PROPS {
        insert(p, SpeedTier::Tier3, MatcherKind::SubProperty, Coercer::String);
    }
    insert("tlp", SpeedTier::Tier3, MatcherKind::Tlp, Coercer::TlpShortName);
    insert(
        "relationships-all",
        SpeedTier::Tier3,
        MatcherKind::RelationshipsAll,
        Coercer::String,
    );

    for &(name, property, op, coercer) in CALCULATION_FIELDS {
        table.insert(
            name,
            FilterInfo {
                tier: SpeedTier::Tier3,
                kind: MatcherKind::Calculation(op),
                coercer,
                property,
                default: None,
            },
        );
    }

    table
}

/// The full closed filter-name table, built once.
pub static FILTER_TABLE: LazyLock<HashMap<&'static str, FilterInfo>> = LazyLock::new(build_table);

/// Look up a recognized filter name. Unknown names are not an error; callers
/// silently ignore them per the filter engine's failure semantics.
#[must_use]
pub fn get_filter_info(name: &str) -> Option<&'static FilterInfo> {
    FILTER_TABLE.get(name)
}

/// Fixed TLP short-name to marking-definition UUID mapping.
pub static TLP_SHORT_NAME_MAP: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("white", "613f2e26-407d-48c7-9eca-b8e91df99dc9"),
        ("green", "34098fce-860f-48ae-8e50-ebd3cc5e41da"),
        ("amber", "f88d31f6-486f-44da-b317-01333bde0b82"),
        ("red", "5e57c739-391a-4eb3-b6be-7d15ca92d5ed"),
    ])
});

/// Resolve a TLP short name (or an already-valid marking-definition id) to
/// its full marking-definition identifier. Idempotent on valid ids.
#[must_use]
pub fn tlp_short_name_to_id(value: &str) -> Option<String> {
    if let Some(uuid) = TLP_SHORT_NAME_MAP.get(value) {
        return Some(format!("marking-definition--{uuid}"));
    }
    if value.starts_with("marking-definition--") {
        return Some(value.to_string());
    }
    None
}
