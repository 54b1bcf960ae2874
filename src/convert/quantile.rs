//! Quantile estimation from a bounded histogram
//!
//! Two phases, two types: a [`QuantileHistogram`] accumulates observations and
//! is consumed by [`QuantileHistogram::build`], which yields an immutable
//! [`QuantileMap`]. Lookups are a right-continuous step-function CDF over the
//! bin edges, deliberately coarse.

/// Accumulating phase: fixed bins over a closed value range
#[derive(Debug, Clone)]
pub struct QuantileHistogram {
    bins: Vec<u64>,
    min: f64,
    max: f64,
}

impl QuantileHistogram {
    /// At least one bin is always allocated.
    pub fn new(bin_count: usize, min: f64, max: f64) -> Self {
        Self {
            bins: vec![0; bin_count.max(1)],
            min,
            max,
        }
    }

    /// Record a value, clamped into the histogram range
    pub fn add(&mut self, value: f64) {
        let index = bin_index(value, self.min, self.max, self.bins.len());
        self.bins[index] += 1;
    }

    pub fn total(&self) -> u64 {
        self.bins.iter().sum()
    }

    /// Convert bin counts into a cumulative curve. An empty histogram builds
    /// an empty map.
    pub fn build(self) -> QuantileMap {
        let total = self.total();
        if total == 0 {
            return QuantileMap::empty();
        }

        let count = self.bins.len();
        let mut running = 0u64;
        let cumulative = self
            .bins
            .iter()
            .map(|&bin| {
                running += bin;
                running as f64 / total as f64
            })
            .collect();

        let edges = (0..count)
            .map(|i| self.min + (self.max - self.min) * (i + 1) as f64 / count as f64)
            .collect();

        QuantileMap::new(edges, cumulative)
    }
}

/// Bin for `value` in `[min, max]` split into `bins` equal parts
pub(crate) fn bin_index(value: f64, min: f64, max: f64, bins: usize) -> usize {
    if max <= min || bins == 0 {
        return 0;
    }

    let clamped = value.clamp(min, max);
    let index = ((clamped - min) / (max - min) * bins as f64).floor() as usize;
    index.min(bins - 1)
}

/// Built phase: ascending bin edges with matching cumulative probabilities
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuantileMap {
    bin_edges: Vec<f64>,
    cumulative: Vec<f64>,
}

impl QuantileMap {
    pub fn new(bin_edges: Vec<f64>, cumulative: Vec<f64>) -> Self {
        Self {
            bin_edges,
            cumulative,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.bin_edges.is_empty()
    }

    /// Cumulative probability below the first edge not less than `value`
    pub fn percentile_for(&self, value: f64) -> f64 {
        if self.bin_edges.is_empty() {
            return 0.0;
        }

        let index = self.bin_edges.partition_point(|&edge| edge < value);
        if index == 0 {
            return 0.0;
        }
        if index >= self.cumulative.len() {
            return 1.0;
        }

        self.cumulative[index - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> QuantileMap {
        let mut histogram = QuantileHistogram::new(10, 0.0, 100.0);
        for value in [10.0, 10.0, 10.0, 90.0, 90.0] {
            histogram.add(value);
        }
        histogram.build()
    }

    #[test]
    fn test_low_values_rank_below_high_values() {
        let map = sample_map();
        assert!(map.percentile_for(10.0) < map.percentile_for(90.0));
    }

    #[test]
    fn test_step_function_values() {
        let map = sample_map();
        // 10 sits on the first edge, 90 sits above the 80 edge: 3 of 5 observed
        assert_eq!(map.percentile_for(10.0), 0.0);
        assert!((map.percentile_for(90.0) - 0.6).abs() < 1e-9);
        assert_eq!(map.percentile_for(150.0), 1.0);
        assert_eq!(map.percentile_for(-5.0), 0.0);
    }

    #[test]
    fn test_empty_histogram_builds_empty_map() {
        let map = QuantileHistogram::new(200, 0.0, 100.0).build();
        assert!(map.is_empty());
        assert_eq!(map.percentile_for(50.0), 0.0);
    }

    #[test]
    fn test_out_of_range_values_clamped_into_end_bins() {
        let mut histogram = QuantileHistogram::new(4, 0.0, 100.0);
        histogram.add(-50.0);
        histogram.add(500.0);
        assert_eq!(histogram.total(), 2);
        assert_eq!(histogram.bins, vec![1, 0, 0, 1]);
    }

    #[test]
    fn test_degenerate_range_uses_first_bin() {
        let mut histogram = QuantileHistogram::new(4, 5.0, 5.0);
        histogram.add(5.0);
        histogram.add(9.0);
        assert_eq!(histogram.bins[0], 2);
    }
}
