//! Derived values available to fallback rules

use crate::convert::context::WorkerContext;
use crate::convert::math::round_nearest;
use crate::profile::{ExperienceFactorSpec, EXPERIENCE_FACTOR};

/// Lowest and highest experience factor
const FACTOR_MIN: f64 = 1.0;
const FACTOR_MAX: f64 = 20.0;

/// Values computed once per record before fallbacks run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DerivedValues {
    pub experience_factor: Option<i32>,
}

impl DerivedValues {
    pub fn compute(spec: Option<&ExperienceFactorSpec>, context: &WorkerContext) -> Self {
        Self {
            experience_factor: spec.and_then(|spec| experience_factor(spec, context)),
        }
    }

    /// Look up a derived value by name
    pub fn get(&self, name: &str) -> Option<i32> {
        if name.eq_ignore_ascii_case(EXPERIENCE_FACTOR) {
            self.experience_factor
        } else {
            None
        }
    }
}

/// Weighted blend of normalized age and experience years, rescaled onto 1-20.
/// A missing input counts as the midpoint; both missing yields nothing.
fn experience_factor(spec: &ExperienceFactorSpec, context: &WorkerContext) -> Option<i32> {
    let age = context.try_get_number(&spec.age_field);
    let experience = context.try_get_number(&spec.experience_years_field);
    if age.is_none() && experience.is_none() {
        return None;
    }

    let age_normalized = age.map_or(0.5, |v| normalize(v, spec.age_min, spec.age_max));
    let experience_normalized = experience.map_or(0.5, |v| {
        normalize(v, spec.experience_min, spec.experience_max)
    });

    let weight_total = spec.age_weight + spec.experience_weight;
    let combined = if weight_total > 0.0 {
        (age_normalized * spec.age_weight + experience_normalized * spec.experience_weight)
            / weight_total
    } else {
        (age_normalized + experience_normalized) / 2.0
    };

    Some(round_nearest(FACTOR_MIN + combined * (FACTOR_MAX - FACTOR_MIN)))
}

fn normalize(value: f64, min: i32, max: i32) -> f64 {
    if max <= min {
        return 0.5;
    }

    let clamped = value.clamp(min as f64, max as f64);
    (clamped - min as f64) / (max - min) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::context::FieldValue;

    fn spec() -> ExperienceFactorSpec {
        ExperienceFactorSpec {
            age_field: "age".into(),
            experience_years_field: "years_active".into(),
            age_min: 18,
            age_max: 48,
            experience_min: 0,
            experience_max: 20,
            age_weight: 0.25,
            experience_weight: 0.75,
        }
    }

    #[test]
    fn test_veteran_scores_high() {
        let ctx = WorkerContext::new([("age", FieldValue::Int(48)), ("years_active", FieldValue::Int(20))]);
        let derived = DerivedValues::compute(Some(&spec()), &ctx);
        assert_eq!(derived.experience_factor, Some(20));
        assert_eq!(derived.get("experiencefactor"), Some(20));
    }

    #[test]
    fn test_rookie_scores_low() {
        let ctx = WorkerContext::new([("age", FieldValue::Int(18)), ("years_active", FieldValue::Int(0))]);
        assert_eq!(DerivedValues::compute(Some(&spec()), &ctx).experience_factor, Some(1));
    }

    #[test]
    fn test_missing_input_counts_as_midpoint() {
        // age missing -> 0.5; experience 20 -> 1.0; 0.25*0.5 + 0.75*1.0 = 0.875
        let ctx = WorkerContext::new([("years_active", FieldValue::Int(20))]);
        let factor = DerivedValues::compute(Some(&spec()), &ctx).experience_factor;
        assert_eq!(factor, Some(round_nearest(1.0 + 0.875 * 19.0)));
    }

    #[test]
    fn test_no_inputs_no_factor() {
        let ctx = WorkerContext::new([("name", FieldValue::from("Nobody"))]);
        assert_eq!(DerivedValues::compute(Some(&spec()), &ctx).experience_factor, None);
        assert_eq!(DerivedValues::compute(None, &ctx), DerivedValues::default());
    }
}
