//! Load mapping profiles from JSON or TOML files
//!
//! Property names match case-insensitively. Keys are rewritten onto their
//! canonical camelCase spelling before typed deserialization, except where an
//! object is keyed by identifiers (attribute ids, group names, role keys).

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::core::{ImportError, Result};
use crate::profile::MappingProfile;

/// Every struct property name the profile model knows
const PROPERTY_NAMES: &[&str] = &[
    "sourceTable",
    "sourceScales",
    "targetScale",
    "mappings",
    "groupWeights",
    "normalization",
    "randomVariation",
    "experienceFactor",
    "reporting",
    "roleCoherence",
    "default",
    "byAttribute",
    "min",
    "max",
    "sourceField",
    "groupSource",
    "mappingMethod",
    "clampMin",
    "clampMax",
    "rounding",
    "defaultIfMissing",
    "piecewise",
    "fallback",
    "ranges",
    "sourceMin",
    "sourceMax",
    "targetMin",
    "targetMax",
    "method",
    "fields",
    "groups",
    "enabled",
    "eliteCap",
    "catastrophicCap",
    "varianceClamp",
    "threshold",
    "maxCount",
    "reduceTo",
    "signatureAttributes",
    "raiseTo",
    "maxStandardDeviation",
    "blendFactor",
    "seed",
    "maxDelta",
    "attributes",
    "ageField",
    "experienceYearsField",
    "ageMin",
    "ageMax",
    "experienceMin",
    "experienceMax",
    "ageWeight",
    "experienceWeight",
    "workerIdField",
    "displayNameFields",
    "histogramBins",
    "roleField",
    "mainEventerValues",
    "mainEventerMinimums",
    "rookieValues",
    "rookieMaximums",
];

/// Objects keyed by identifier whose values are profile structs
const KEYED_STRUCT_MAPS: &[&str] = &["byAttribute", "mappings"];

/// Objects keyed by identifier whose values are plain data
const KEYED_DATA_MAPS: &[&str] = &["groups", "mainEventerMinimums", "rookieMaximums"];

/// Load a profile, choosing TOML for `.toml` files and JSON otherwise
pub fn load_profile(path: &Path) -> Result<MappingProfile> {
    let content = fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let value = if is_toml {
        let table: toml::Value = toml::from_str(&content)?;
        serde_json::to_value(table)?
    } else {
        serde_json::from_str(&content)?
    };

    let profile = parse_profile_value(value)
        .map_err(|e| ImportError::ProfileShape(format!("{}: {}", path.display(), e)))?;

    tracing::info!(
        "Loaded mapping profile {} ({} attributes from '{}')",
        path.display(),
        profile.mappings.len(),
        profile.source_table
    );
    Ok(profile)
}

/// Parse a profile from JSON text
pub fn parse_profile_json(content: &str) -> Result<MappingProfile> {
    let value: Value = serde_json::from_str(content)?;
    parse_profile_value(value).map_err(ImportError::ProfileShape)
}

fn parse_profile_value(value: Value) -> std::result::Result<MappingProfile, String> {
    let Value::Object(root) = value else {
        return Err("profile root must be an object".to_string());
    };

    let canonical = Value::Object(canonicalize_struct(root));
    serde_json::from_value(canonical).map_err(|e| e.to_string())
}

fn canonical_name(key: &str) -> Option<&'static str> {
    PROPERTY_NAMES
        .iter()
        .find(|name| name.eq_ignore_ascii_case(key))
        .copied()
}

fn canonicalize_struct(object: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::with_capacity(object.len());
    for (key, value) in object {
        let name = canonical_name(&key).map_or(key, str::to_string);
        let value = if KEYED_STRUCT_MAPS.contains(&name.as_str()) {
            canonicalize_keyed(value)
        } else if KEYED_DATA_MAPS.contains(&name.as_str()) {
            value
        } else {
            canonicalize_value(value)
        };
        out.insert(name, value);
    }
    out
}

fn canonicalize_keyed(value: Value) -> Value {
    match value {
        Value::Object(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(id, inner)| (id, canonicalize_value(inner)))
                .collect(),
        ),
        other => other,
    }
}

fn canonicalize_value(value: Value) -> Value {
    match value {
        Value::Object(object) => Value::Object(canonicalize_struct(object)),
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize_value).collect()),
        other => other,
    }
}
