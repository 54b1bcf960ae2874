//! Per-record attribute conversion
//!
//! A record never fails to convert: unresolved fields take the mapping's
//! default (or a fallback), and every mapped value is rounded and clamped.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::convert::context::WorkerContext;
use crate::convert::derived::DerivedValues;
use crate::convert::math::{self, apply_rounding, clamp, round_nearest};
use crate::convert::normalizer;
use crate::convert::{AttributeSet, QuantileMaps};
use crate::profile::{
    non_blank_field, AttributeMapping, FallbackMethod, FallbackRule, MappingMethod, MappingProfile,
};

/// Converts source records into the target attribute scale.
///
/// The random source is only consumed by random variation, in profile order,
/// so a fixed seed reproduces a run exactly.
pub struct AttributeConverter<R: Rng = ChaCha8Rng> {
    profile: MappingProfile,
    rng: R,
}

impl AttributeConverter<ChaCha8Rng> {
    /// Converter with a ChaCha8 stream seeded from `seed`
    pub fn seeded(profile: MappingProfile, seed: u64) -> Self {
        Self::new(profile, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> AttributeConverter<R> {
    pub fn new(profile: MappingProfile, rng: R) -> Self {
        Self { profile, rng }
    }

    pub fn profile(&self) -> &MappingProfile {
        &self.profile
    }

    /// Convert one record. Quantile-mapped attributes without an entry in
    /// `quantiles` map linearly.
    pub fn convert_worker(
        &mut self,
        context: &WorkerContext,
        quantiles: Option<&QuantileMaps>,
    ) -> AttributeSet {
        let mut results = AttributeSet::new();
        let mut missing: Vec<&str> = Vec::new();
        let derived = DerivedValues::compute(self.profile.experience_factor.as_ref(), context);

        // 1-3. resolve, map, round, clamp
        for (attribute, mapping) in self.profile.mappings.iter() {
            match self.resolve_source_value(attribute, mapping, context) {
                Some(raw) => {
                    let mapped = self.map_value(attribute, mapping, raw, quantiles);
                    results.insert(attribute, mapped);
                }
                None => {
                    missing.push(attribute);
                    results.insert(attribute, mapping.default_if_missing);
                }
            }
        }

        // 4. fallbacks, in profile order
        let target = self.profile.target_scale;
        for attribute in missing {
            let Some((mapping, rule)) = self
                .profile
                .mappings
                .get(attribute)
                .and_then(|mapping| Some((mapping, mapping.fallback.as_ref()?)))
            else {
                continue;
            };

            if let Some(value) = resolve_fallback(rule, &results, &derived) {
                let bounded = clamp(
                    value,
                    mapping.clamp_min.unwrap_or(target.min),
                    mapping.clamp_max.unwrap_or(target.max),
                );
                results.insert(attribute, bounded);
            }
        }

        // 5. random variation
        self.apply_random_variation(&mut results);

        // 6. role coherence
        if let Some(coherence) = &self.profile.role_coherence {
            normalizer::apply_role_coherence(&mut results, coherence, context);
        }

        // 7. normalization plus the final safety clamp
        if self.profile.normalization.enabled {
            normalizer::normalize(&mut results, &self.profile.normalization);
            for (_, value) in results.iter_mut() {
                *value = clamp(*value, target.min, target.max);
            }
        }

        results
    }

    /// Direct field first; otherwise the group source, weighted when the
    /// group lists a weight for this attribute.
    pub fn resolve_source_value(
        &self,
        attribute: &str,
        mapping: &AttributeMapping,
        context: &WorkerContext,
    ) -> Option<f64> {
        if let Some(value) = non_blank_field(mapping.source_field.as_deref())
            .and_then(|field| context.try_get_number(field))
        {
            return Some(value);
        }

        let group = non_blank_field(mapping.group_source.as_deref())?;
        let value = context.try_get_number(group)?;
        match self.profile.group_weights.weight(group, attribute) {
            Some(weight) => Some(value * weight),
            None => Some(value),
        }
    }

    fn map_value(
        &self,
        attribute: &str,
        mapping: &AttributeMapping,
        value: f64,
        quantiles: Option<&QuantileMaps>,
    ) -> i32 {
        let source = self.profile.source_scale_for(attribute);
        let target = self.profile.target_scale;

        let mapped = match mapping.mapping_method {
            MappingMethod::Linear => math::map_linear(value, source, target),
            MappingMethod::Piecewise => {
                let ranges = mapping
                    .piecewise
                    .as_ref()
                    .map_or(&[][..], |spec| spec.ranges.as_slice());
                math::map_piecewise(value, ranges, target)
            }
            MappingMethod::Quantile => {
                let map = quantiles.and_then(|maps| maps.get(attribute));
                math::map_quantile(value, map, target)
            }
        };

        let rounded = apply_rounding(mapped, mapping.rounding);
        clamp(
            rounded,
            mapping.clamp_min.unwrap_or(target.min),
            mapping.clamp_max.unwrap_or(target.max),
        )
    }

    /// Signed delta in `[-max_delta, max_delta]` per listed attribute:
    /// magnitude first, then sign.
    fn apply_random_variation(&mut self, results: &mut AttributeSet) {
        let Some(variation) = self.profile.random_variation.as_ref().filter(|rv| rv.enabled) else {
            return;
        };

        let max_delta = variation.max_delta.max(0);
        let target = self.profile.target_scale;

        for attribute in &variation.attributes {
            let Some(value) = results.get_mut(attribute) else {
                continue;
            };

            let delta = self.rng.gen_range(0..=max_delta);
            let sign = if self.rng.gen_range(0..2) == 0 { -1 } else { 1 };
            *value = clamp(*value + delta * sign, target.min, target.max);
        }
    }
}

/// Average of the named fields that resolve, from computed attributes first
/// and derived values second.
fn resolve_fallback(
    rule: &FallbackRule,
    results: &AttributeSet,
    derived: &DerivedValues,
) -> Option<i32> {
    if rule.method != FallbackMethod::Average {
        return None;
    }

    let values: Vec<i32> = rule
        .fields
        .iter()
        .filter_map(|field| results.get(field).copied().or_else(|| derived.get(field)))
        .collect();

    if values.is_empty() {
        return None;
    }

    let sum: i64 = values.iter().map(|&v| v as i64).sum();
    Some(round_nearest(sum as f64 / values.len() as f64))
}
