//! Attribute conversion: scale math, quantile estimation, record access,
//! the per-record converter, and normalization

pub mod context;
pub mod converter;
pub mod derived;
pub mod math;
pub mod normalizer;
pub mod quantile;

pub use context::{FieldValue, WorkerContext};
pub use converter::AttributeConverter;
pub use derived::DerivedValues;
pub use quantile::{QuantileHistogram, QuantileMap};

use crate::profile::NamedMap;

/// Converted attribute id -> target-scale value, in profile order
pub type AttributeSet = NamedMap<i32>;

/// Attribute id -> built quantile map
pub type QuantileMaps = NamedMap<QuantileMap>;
