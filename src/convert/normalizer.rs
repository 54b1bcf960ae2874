//! Post-conversion reshaping of a record's attribute set
//!
//! Three passes run in order: elite cap, catastrophic cap, variance clamp.
//! Candidates with equal values are taken in attribute id order
//! (case-insensitive), so results never depend on collection internals.
//! Each pass may leave values outside the target scale; the converter
//! re-clamps afterwards.

use std::cmp::Ordering;

use crate::convert::context::WorkerContext;
use crate::convert::math::round_nearest;
use crate::convert::AttributeSet;
use crate::profile::{CatastrophicCap, EliteCap, NormalizationRules, RoleCoherence, VarianceClamp};

/// Run every enabled pass over `attributes`
pub fn normalize(attributes: &mut AttributeSet, rules: &NormalizationRules) {
    apply_elite_cap(attributes, &rules.elite_cap);
    apply_catastrophic_cap(attributes, &rules.catastrophic_cap);
    apply_variance_clamp(attributes, &rules.variance_clamp);
}

/// Limit how many attributes sit at or above the elite threshold.
///
/// Signature attributes are never reduced and take allowed slots first. The
/// highest remaining attributes keep the other slots; the next-highest beyond
/// them are reduced to `reduce_to` one at a time. Every attribute is reduced
/// at most once, so the pass ends even when signatures alone exceed the limit.
pub fn apply_elite_cap(attributes: &mut AttributeSet, elite: &EliteCap) {
    if !elite.enabled {
        return;
    }

    let is_signature = |id: &str| {
        elite
            .signature_attributes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(id))
    };
    let mut reduced: Vec<String> = Vec::new();

    loop {
        let elites = ranked(attributes, |v| v >= elite.threshold, Ordering::Greater);
        if elites.len() <= elite.max_count {
            break;
        }

        let signature_count = elites.iter().filter(|(id, _)| is_signature(id.as_str())).count();
        let open_slots = elite.max_count.saturating_sub(signature_count);

        let next = elites
            .iter()
            .filter(|(id, _)| !is_signature(id.as_str()))
            .skip(open_slots)
            .find(|(id, _)| !contains_id(&reduced, id));
        let Some((id, _)) = next else {
            break;
        };

        if let Some(value) = attributes.get_mut(id) {
            *value = (*value).min(elite.reduce_to);
        }
        reduced.push(id.clone());
    }
}

/// Limit how many attributes sit at or below the catastrophic threshold by
/// raising the lowest first. Every attribute is raised at most once.
pub fn apply_catastrophic_cap(attributes: &mut AttributeSet, catastrophic: &CatastrophicCap) {
    if !catastrophic.enabled {
        return;
    }

    let mut raised: Vec<String> = Vec::new();

    loop {
        let lows = ranked(attributes, |v| v <= catastrophic.threshold, Ordering::Less);
        if lows.len() <= catastrophic.max_count {
            break;
        }

        let Some((id, _)) = lows.iter().find(|(id, _)| !contains_id(&raised, id)) else {
            break;
        };

        if let Some(value) = attributes.get_mut(id) {
            *value = (*value).max(catastrophic.raise_to);
        }
        raised.push(id.clone());
    }
}

/// Blend every attribute toward the record's mean once when the population
/// standard deviation exceeds the configured maximum.
pub fn apply_variance_clamp(attributes: &mut AttributeSet, clamp: &VarianceClamp) {
    if !clamp.enabled || attributes.is_empty() {
        return;
    }

    let count = attributes.len() as f64;
    let mean = attributes.values().map(|&v| v as f64).sum::<f64>() / count;
    let variance = attributes
        .values()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / count;

    if variance.sqrt() <= clamp.max_standard_deviation {
        return;
    }

    for (_, value) in attributes.iter_mut() {
        *value = round_nearest(mean + (*value as f64 - mean) * clamp.blend_factor);
    }
}

/// Raise listed attributes of main-event roles to their minimums and cap
/// listed attributes of rookie roles at their maximums. Only attributes
/// already present are touched.
pub fn apply_role_coherence(
    attributes: &mut AttributeSet,
    coherence: &RoleCoherence,
    context: &WorkerContext,
) {
    if !coherence.enabled {
        return;
    }

    let Some(role) = context
        .try_get_string(&coherence.role_field)
        .filter(|role| !role.trim().is_empty())
    else {
        return;
    };

    let matches_role = |values: &[String]| values.iter().any(|v| v.eq_ignore_ascii_case(&role));

    if matches_role(coherence.main_eventer_values.as_slice()) {
        for (attribute, &minimum) in coherence.main_eventer_minimums.iter() {
            if let Some(value) = attributes.get_mut(attribute) {
                *value = (*value).max(minimum);
            }
        }
    }

    if matches_role(coherence.rookie_values.as_slice()) {
        for (attribute, &maximum) in coherence.rookie_maximums.iter() {
            if let Some(value) = attributes.get_mut(attribute) {
                *value = (*value).min(maximum);
            }
        }
    }
}

/// Attributes passing `qualifies`, ordered by value (`Greater` = descending)
/// then by id.
fn ranked(
    attributes: &AttributeSet,
    qualifies: impl Fn(i32) -> bool,
    direction: Ordering,
) -> Vec<(String, i32)> {
    let mut selected: Vec<(String, i32)> = attributes
        .iter()
        .filter(|(_, &v)| qualifies(v))
        .map(|(id, &v)| (id.to_string(), v))
        .collect();

    selected.sort_by(|(a_id, a), (b_id, b)| {
        let by_value = if direction == Ordering::Greater {
            b.cmp(a)
        } else {
            a.cmp(b)
        };
        by_value.then_with(|| a_id.to_ascii_lowercase().cmp(&b_id.to_ascii_lowercase()))
    });
    selected
}

fn contains_id(ids: &[String], id: &str) -> bool {
    ids.iter().any(|existing| existing.eq_ignore_ascii_case(id))
}
