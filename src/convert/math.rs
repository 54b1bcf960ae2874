//! Scale and mapping math
//!
//! Pure functions over closed intervals. Mapping results are unrounded and
//! unclamped; callers round and clamp.

use crate::convert::quantile::QuantileMap;
use crate::profile::{PiecewiseRange, RoundingPolicy, Scale};

/// Source scale assumed when a piecewise table or quantile map is unavailable
pub const FALLBACK_SOURCE_SCALE: Scale = Scale::new(0, 100);

pub fn clamp(value: i32, min: i32, max: i32) -> i32 {
    value.max(min).min(max)
}

/// Round to an integer. Nearest rounds half to even.
pub fn apply_rounding(value: f64, policy: RoundingPolicy) -> i32 {
    let rounded = match policy {
        RoundingPolicy::Floor => value.floor(),
        RoundingPolicy::Ceil => value.ceil(),
        RoundingPolicy::Nearest => value.round_ties_even(),
    };
    rounded as i32
}

/// Nearest-integer rounding used by averages and blends
pub fn round_nearest(value: f64) -> i32 {
    apply_rounding(value, RoundingPolicy::Nearest)
}

pub fn map_linear(value: f64, source: Scale, target: Scale) -> f64 {
    if source.max == source.min {
        return target.min as f64;
    }

    let normalized = (value - source.min as f64) / (source.max - source.min) as f64;
    target.min as f64 + normalized * (target.max - target.min) as f64
}

/// First containing range wins; values outside every range saturate.
pub fn map_piecewise(value: f64, ranges: &[PiecewiseRange], target: Scale) -> f64 {
    let Some(first) = ranges.first() else {
        return map_linear(value, FALLBACK_SOURCE_SCALE, target);
    };

    let Some(range) = ranges
        .iter()
        .find(|r| value >= r.source_min as f64 && value <= r.source_max as f64)
    else {
        return if value < first.source_min as f64 {
            target.min as f64
        } else {
            target.max as f64
        };
    };

    if range.source_max == range.source_min {
        return range.target_min as f64;
    }

    let normalized = (value - range.source_min as f64) / (range.source_max - range.source_min) as f64;
    range.target_min as f64 + normalized * (range.target_max - range.target_min) as f64
}

/// Percentile rescale. A missing or empty map maps linearly over 0-100.
pub fn map_quantile(value: f64, map: Option<&QuantileMap>, target: Scale) -> f64 {
    match map {
        Some(map) if !map.is_empty() => {
            let percentile = map.percentile_for(value);
            target.min as f64 + percentile * (target.max - target.min) as f64
        }
        _ => map_linear(value, FALLBACK_SOURCE_SCALE, target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::quantile::QuantileHistogram;

    const TARGET: Scale = Scale::new(1, 20);

    fn bands() -> Vec<PiecewiseRange> {
        vec![
            PiecewiseRange { source_min: 0, source_max: 49, target_min: 1, target_max: 10 },
            PiecewiseRange { source_min: 50, source_max: 74, target_min: 11, target_max: 15 },
            PiecewiseRange { source_min: 75, source_max: 89, target_min: 16, target_max: 18 },
            PiecewiseRange { source_min: 90, source_max: 100, target_min: 19, target_max: 20 },
        ]
    }

    #[test]
    fn test_linear_endpoints() {
        let source = Scale::new(0, 100);
        assert_eq!(map_linear(0.0, source, TARGET), 1.0);
        assert_eq!(map_linear(100.0, source, TARGET), 20.0);
    }

    #[test]
    fn test_linear_midpoint_rounds_to_ten() {
        let mapped = map_linear(50.0, Scale::new(0, 100), TARGET);
        assert_eq!(apply_rounding(mapped, RoundingPolicy::Nearest), 10);
        assert_eq!(apply_rounding(mapped, RoundingPolicy::Ceil), 11);
    }

    #[test]
    fn test_linear_degenerate_source() {
        assert_eq!(map_linear(42.0, Scale::new(5, 5), TARGET), 1.0);
    }

    #[test]
    fn test_piecewise_band_edges() {
        let ranges = bands();
        assert_eq!(map_piecewise(49.0, &ranges, TARGET), 10.0);
        assert_eq!(map_piecewise(50.0, &ranges, TARGET), 11.0);
        assert_eq!(map_piecewise(90.0, &ranges, TARGET), 19.0);
    }

    #[test]
    fn test_piecewise_saturates_outside_ranges() {
        let ranges = vec![PiecewiseRange { source_min: 10, source_max: 20, target_min: 5, target_max: 6 }];
        assert_eq!(map_piecewise(3.0, &ranges, TARGET), 1.0);
        assert_eq!(map_piecewise(25.0, &ranges, TARGET), 20.0);
    }

    #[test]
    fn test_piecewise_without_ranges_is_linear() {
        assert_eq!(map_piecewise(100.0, &[], TARGET), 20.0);
    }

    #[test]
    fn test_quantile_without_map_is_linear() {
        assert_eq!(map_quantile(0.0, None, TARGET), 1.0);
        let empty = QuantileHistogram::new(10, 0.0, 100.0).build();
        assert_eq!(map_quantile(100.0, Some(&empty), TARGET), 20.0);
    }

    #[test]
    fn test_rounding_policies() {
        assert_eq!(apply_rounding(3.7, RoundingPolicy::Floor), 3);
        assert_eq!(apply_rounding(3.2, RoundingPolicy::Ceil), 4);
        assert_eq!(apply_rounding(2.5, RoundingPolicy::Nearest), 2);
        assert_eq!(apply_rounding(3.5, RoundingPolicy::Nearest), 4);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(25, 1, 20), 20);
        assert_eq!(clamp(-3, 1, 20), 1);
        assert_eq!(clamp(7, 1, 20), 7);
    }
}
