//! Pipeline configuration with documented constants
//!
//! The mapping profile carries everything that is tuned per source dataset.
//! The values here are the fixed knobs of the pipeline itself.

use std::path::PathBuf;

use crate::profile::ReportingSpec;

/// Conventional location of the bundled mapping profile
pub const DEFAULT_PROFILE_PATH: &str = "profiles/attribute-mapping.json";

/// Configuration for the two-pass report pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of bins in each quantile histogram built during pass 1
    ///
    /// Percentile lookups are a step function over these bins, so this is
    /// the resolution of every quantile-mapped attribute.
    pub quantile_bins: usize,

    /// Length of each ranked outlier list (most and least boosted)
    pub outlier_count: usize,

    /// Reporting descriptor used when the profile does not provide one
    pub default_reporting: ReportingSpec,

    /// Profile path used when the caller does not override it
    pub profile_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            quantile_bins: 200,
            outlier_count: 20,
            default_reporting: ReportingSpec {
                worker_id_field: "id".to_string(),
                display_name_fields: vec!["name".to_string()],
                histogram_bins: 10,
            },
            profile_path: PathBuf::from(DEFAULT_PROFILE_PATH),
        }
    }
}

impl PipelineConfig {
    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.quantile_bins == 0 {
            return Err("quantile_bins must be at least 1".into());
        }

        if self.default_reporting.histogram_bins == 0 {
            return Err("default reporting histogram_bins must be at least 1".into());
        }

        if self.default_reporting.worker_id_field.trim().is_empty() {
            return Err("default reporting worker_id_field must not be blank".into());
        }

        Ok(())
    }
}
