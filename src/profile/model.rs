//! Mapping profile data model
//!
//! A profile declares how each target attribute is derived from the source
//! dataset. It is loaded once per run and read-only afterwards.

use serde::{Deserialize, Serialize};

use crate::profile::NamedMap;

/// Name of the derived value fallback rules may reference
pub const EXPERIENCE_FACTOR: &str = "ExperienceFactor";

/// Closed integer interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scale {
    pub min: i32,
    pub max: i32,
}

impl Scale {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }
}

/// Source scales: one default plus optional per-attribute overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleSet {
    pub default: Scale,
    #[serde(default)]
    pub by_attribute: Option<NamedMap<Scale>>,
}

/// How a resolved source value is carried onto the target scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MappingMethod {
    Linear,
    Piecewise,
    Quantile,
}

impl From<String> for MappingMethod {
    /// Unknown tags map linearly.
    fn from(tag: String) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "piecewise" => MappingMethod::Piecewise,
            "quantile" => MappingMethod::Quantile,
            _ => MappingMethod::Linear,
        }
    }
}

impl From<MappingMethod> for String {
    fn from(method: MappingMethod) -> Self {
        match method {
            MappingMethod::Linear => "Linear",
            MappingMethod::Piecewise => "Piecewise",
            MappingMethod::Quantile => "Quantile",
        }
        .to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoundingPolicy {
    Floor,
    Ceil,
    #[default]
    Nearest,
}

impl From<String> for RoundingPolicy {
    fn from(tag: String) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "floor" => RoundingPolicy::Floor,
            "ceil" => RoundingPolicy::Ceil,
            _ => RoundingPolicy::Nearest,
        }
    }
}

impl From<RoundingPolicy> for String {
    fn from(policy: RoundingPolicy) -> Self {
        match policy {
            RoundingPolicy::Floor => "floor",
            RoundingPolicy::Ceil => "ceil",
            RoundingPolicy::Nearest => "round",
        }
        .to_string()
    }
}

/// One band of a piecewise mapping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PiecewiseRange {
    pub source_min: i32,
    pub source_max: i32,
    pub target_min: i32,
    pub target_max: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PiecewiseSpec {
    #[serde(default)]
    pub ranges: Vec<PiecewiseRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FallbackMethod {
    Average,
    /// Kept so unknown rules load; they never overwrite the default.
    Unsupported(String),
}

impl From<String> for FallbackMethod {
    fn from(tag: String) -> Self {
        if tag.eq_ignore_ascii_case("average") {
            FallbackMethod::Average
        } else {
            FallbackMethod::Unsupported(tag)
        }
    }
}

impl From<FallbackMethod> for String {
    fn from(method: FallbackMethod) -> Self {
        match method {
            FallbackMethod::Average => "Average".to_string(),
            FallbackMethod::Unsupported(tag) => tag,
        }
    }
}

/// Rule used when an attribute's source value cannot be resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackRule {
    pub method: FallbackMethod,
    /// Already-computed attribute ids or derived value names
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Per target attribute mapping descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeMapping {
    #[serde(default)]
    pub source_field: Option<String>,
    /// Consulted only when the direct source field does not resolve
    #[serde(default)]
    pub group_source: Option<String>,
    pub mapping_method: MappingMethod,
    #[serde(default)]
    pub clamp_min: Option<i32>,
    #[serde(default)]
    pub clamp_max: Option<i32>,
    #[serde(default)]
    pub rounding: RoundingPolicy,
    pub default_if_missing: i32,
    #[serde(default)]
    pub piecewise: Option<PiecewiseSpec>,
    #[serde(default)]
    pub fallback: Option<FallbackRule>,
}

impl AttributeMapping {
    /// A linear mapping from `field` with the given default
    pub fn linear(field: &str, default_if_missing: i32) -> Self {
        Self {
            source_field: Some(field.to_string()),
            group_source: None,
            mapping_method: MappingMethod::Linear,
            clamp_min: None,
            clamp_max: None,
            rounding: RoundingPolicy::Nearest,
            default_if_missing,
            piecewise: None,
            fallback: None,
        }
    }

    /// The field whose raw value represents this attribute in the source
    pub fn raw_field(&self) -> Option<&str> {
        non_blank_field(self.source_field.as_deref())
            .or_else(|| non_blank_field(self.group_source.as_deref()))
    }
}

pub fn non_blank_field(field: Option<&str>) -> Option<&str> {
    field.filter(|f| !f.trim().is_empty())
}

/// Group name -> (attribute id -> weight)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupWeights {
    #[serde(default)]
    pub groups: NamedMap<NamedMap<f64>>,
}

impl GroupWeights {
    pub fn weight(&self, group: &str, attribute: &str) -> Option<f64> {
        self.groups.get(group)?.get(attribute).copied()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EliteCap {
    pub enabled: bool,
    pub threshold: i32,
    pub max_count: usize,
    pub reduce_to: i32,
    /// Never reduced
    #[serde(default)]
    pub signature_attributes: Vec<String>,
}

impl Default for EliteCap {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 18,
            max_count: 3,
            reduce_to: 17,
            signature_attributes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatastrophicCap {
    pub enabled: bool,
    pub threshold: i32,
    pub max_count: usize,
    pub raise_to: i32,
}

impl Default for CatastrophicCap {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 3,
            max_count: 4,
            raise_to: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VarianceClamp {
    pub enabled: bool,
    pub max_standard_deviation: f64,
    /// 0.0 collapses onto the mean, 1.0 leaves values untouched
    pub blend_factor: f64,
}

impl Default for VarianceClamp {
    fn default() -> Self {
        Self {
            enabled: false,
            max_standard_deviation: 10.0,
            blend_factor: 0.9,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationRules {
    pub enabled: bool,
    #[serde(default)]
    pub elite_cap: EliteCap,
    #[serde(default)]
    pub catastrophic_cap: CatastrophicCap,
    #[serde(default)]
    pub variance_clamp: VarianceClamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomVariation {
    pub enabled: bool,
    #[serde(default)]
    pub seed: u64,
    pub max_delta: i32,
    #[serde(default)]
    pub attributes: Vec<String>,
}

/// Inputs of the derived experience factor (1-20)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceFactorSpec {
    pub age_field: String,
    pub experience_years_field: String,
    pub age_min: i32,
    pub age_max: i32,
    pub experience_min: i32,
    pub experience_max: i32,
    pub age_weight: f64,
    pub experience_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportingSpec {
    pub worker_id_field: String,
    #[serde(default)]
    pub display_name_fields: Vec<String>,
    pub histogram_bins: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCoherence {
    pub enabled: bool,
    pub role_field: String,
    #[serde(default)]
    pub main_eventer_values: Vec<String>,
    #[serde(default)]
    pub main_eventer_minimums: NamedMap<i32>,
    #[serde(default)]
    pub rookie_values: Vec<String>,
    #[serde(default)]
    pub rookie_maximums: NamedMap<i32>,
}

/// Complete mapping profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingProfile {
    pub source_table: String,
    pub source_scales: ScaleSet,
    pub target_scale: Scale,
    /// Attribute id -> mapping, in conversion order
    pub mappings: NamedMap<AttributeMapping>,
    #[serde(default)]
    pub group_weights: GroupWeights,
    #[serde(default)]
    pub normalization: NormalizationRules,
    #[serde(default)]
    pub random_variation: Option<RandomVariation>,
    #[serde(default)]
    pub experience_factor: Option<ExperienceFactorSpec>,
    #[serde(default)]
    pub reporting: Option<ReportingSpec>,
    #[serde(default)]
    pub role_coherence: Option<RoleCoherence>,
}

impl MappingProfile {
    /// Minimal profile: no groups, normalization, or optional sections
    pub fn new(
        source_table: &str,
        source_scale: Scale,
        target_scale: Scale,
        mappings: NamedMap<AttributeMapping>,
    ) -> Self {
        Self {
            source_table: source_table.to_string(),
            source_scales: ScaleSet {
                default: source_scale,
                by_attribute: None,
            },
            target_scale,
            mappings,
            group_weights: GroupWeights::default(),
            normalization: NormalizationRules::default(),
            random_variation: None,
            experience_factor: None,
            reporting: None,
            role_coherence: None,
        }
    }

    /// Per-attribute override, else the default source scale
    pub fn source_scale_for(&self, attribute: &str) -> Scale {
        self.source_scales
            .by_attribute
            .as_ref()
            .and_then(|overrides| overrides.get(attribute))
            .copied()
            .unwrap_or(self.source_scales.default)
    }

    pub fn attribute_ids(&self) -> impl Iterator<Item = &str> {
        self.mappings.keys()
    }

    /// Attributes that need a quantile map built before conversion
    pub fn quantile_attributes(&self) -> impl Iterator<Item = (&str, &AttributeMapping)> {
        self.mappings
            .iter()
            .filter(|(_, mapping)| mapping.mapping_method == MappingMethod::Quantile)
    }

    /// Seed configured for random variation, or 0
    pub fn configured_seed(&self) -> u64 {
        self.random_variation.as_ref().map_or(0, |rv| rv.seed)
    }

    /// Every column referenced anywhere in the profile, deduplicated
    /// case-insensitively in first-reference order.
    pub fn required_columns(&self, reporting: &ReportingSpec) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        let mut push = |column: &str| {
            if column.trim().is_empty() {
                return;
            }
            if !columns.iter().any(|c| c.eq_ignore_ascii_case(column)) {
                columns.push(column.to_string());
            }
        };

        for mapping in self.mappings.values() {
            if let Some(field) = non_blank_field(mapping.source_field.as_deref()) {
                push(field);
            }
            if let Some(group) = non_blank_field(mapping.group_source.as_deref()) {
                push(group);
            }
        }

        if let Some(experience) = &self.experience_factor {
            push(&experience.age_field);
            push(&experience.experience_years_field);
        }

        push(&reporting.worker_id_field);
        for field in &reporting.display_name_fields {
            push(field);
        }

        if let Some(coherence) = &self.role_coherence {
            push(&coherence.role_field);
        }

        columns
    }
}
