//! Running per-attribute statistics for reports

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::convert::quantile::bin_index;

/// Sum, count, observed extremes, and a fixed-bin histogram over a range
#[derive(Debug, Clone)]
pub struct AttributeStats {
    range_min: f64,
    range_max: f64,
    histogram: Vec<u64>,
    sum: f64,
    count: u64,
    min_observed: f64,
    max_observed: f64,
}

impl AttributeStats {
    pub fn new(bins: usize, range_min: f64, range_max: f64) -> Self {
        Self {
            range_min,
            range_max,
            histogram: vec![0; bins.max(1)],
            sum: 0.0,
            count: 0,
            min_observed: f64::MAX,
            max_observed: f64::MIN,
        }
    }

    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
        self.min_observed = self.min_observed.min(value);
        self.max_observed = self.max_observed.max(value);

        let index = bin_index(value, self.range_min, self.range_max, self.histogram.len());
        self.histogram[index] += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn min(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.min_observed
        }
    }

    pub fn max(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.max_observed
        }
    }

    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    pub fn histogram(&self) -> &[u64] {
        &self.histogram
    }
}

impl Serialize for AttributeStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AttributeStats", 5)?;
        state.serialize_field("count", &self.count)?;
        state.serialize_field("min", &self.min())?;
        state.serialize_field("max", &self.max())?;
        state.serialize_field("average", &self.average())?;
        state.serialize_field("histogram", &self.histogram)?;
        state.end()
    }
}
