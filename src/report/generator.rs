//! Two-pass report generation over a source store
//!
//! Pass 1 builds quantile maps and raw-value stats. Pass 2 converts every
//! record against those maps and accumulates converted stats plus per-worker
//! averages for the outlier rankings.

use std::cmp::Reverse;
use std::fs;
use std::path::Path;

use ordered_float::OrderedFloat;
use rand::Rng;
use serde::Serialize;

use crate::convert::{
    AttributeConverter, AttributeSet, QuantileHistogram, QuantileMaps, WorkerContext,
};
use crate::core::{ImportError, PipelineConfig, Result};
use crate::profile::{MappingProfile, NamedMap, ReportingSpec};
use crate::report::source::{SourceQuery, SourceStore};
use crate::report::stats::AttributeStats;

/// Overall average of one converted worker
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerScore {
    pub worker_id: String,
    pub name: String,
    pub average: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportSection {
    pub attributes: NamedMap<AttributeStats>,
}

/// The report artifact
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeReport {
    pub source_table: String,
    pub source: ReportSection,
    pub converted: ReportSection,
    /// Highest overall averages, descending
    pub overboosted: Vec<WorkerScore>,
    /// Lowest overall averages, ascending
    pub too_weak: Vec<WorkerScore>,
}

/// One worker's converted attributes, as handed to the importer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedWorker {
    pub worker_id: String,
    pub name: String,
    pub attributes: AttributeSet,
}

struct SourcePass {
    quantiles: QuantileMaps,
    stats: NamedMap<AttributeStats>,
    rows: usize,
}

pub struct ReportGenerator {
    config: PipelineConfig,
}

impl ReportGenerator {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate().map_err(ImportError::InvalidConfig)?;
        Ok(Self { config })
    }

    /// Reporting descriptor of the profile, else the configured default
    pub fn reporting_for(&self, profile: &MappingProfile) -> ReportingSpec {
        profile
            .reporting
            .clone()
            .unwrap_or_else(|| self.config.default_reporting.clone())
    }

    /// Columns to select: everything the profile references, then the
    /// default reporting columns if not already present.
    pub fn required_columns(&self, profile: &MappingProfile) -> Vec<String> {
        let mut columns = profile.required_columns(&self.reporting_for(profile));
        let default = &self.config.default_reporting;
        let extra = std::iter::once(&default.worker_id_field).chain(&default.display_name_fields);
        for column in extra {
            if !column.trim().is_empty() && !columns.iter().any(|c| c.eq_ignore_ascii_case(column)) {
                columns.push(column.clone());
            }
        }
        columns
    }

    /// Run both passes and build the report
    pub fn generate<R: Rng>(
        &self,
        store: &SourceStore,
        converter: &mut AttributeConverter<R>,
    ) -> Result<AttributeReport> {
        let profile = converter.profile().clone();
        let reporting = self.reporting_for(&profile);
        let query = store.prepare_query(&profile.source_table, &self.required_columns(&profile))?;

        let pass = self.scan_sources(store, &query, converter, reporting.histogram_bins)?;

        let target = profile.target_scale;
        let mut converted: NamedMap<AttributeStats> = profile
            .attribute_ids()
            .map(|id| {
                let stats =
                    AttributeStats::new(reporting.histogram_bins, target.min as f64, target.max as f64);
                (id, stats)
            })
            .collect();
        let mut scores: Vec<WorkerScore> = Vec::with_capacity(pass.rows);

        let rows = Self::scan_conversions(store, &query, converter, &pass.quantiles, |context, attributes| {
            for (attribute, &value) in attributes.iter() {
                if let Some(stats) = converted.get_mut(attribute) {
                    stats.add(value as f64);
                }
            }

            let (worker_id, name) = identify(context, &reporting);
            scores.push(WorkerScore {
                worker_id,
                name,
                average: average(attributes),
            });
        })?;

        tracing::info!("Converted {} workers from '{}'", rows, profile.source_table);

        let (overboosted, too_weak) = rank_outliers(scores, self.config.outlier_count);

        Ok(AttributeReport {
            source_table: profile.source_table.clone(),
            source: ReportSection { attributes: pass.stats },
            converted: ReportSection { attributes: converted },
            overboosted,
            too_weak,
        })
    }

    /// Run both passes and collect every converted worker in scan order
    pub fn export<R: Rng>(
        &self,
        store: &SourceStore,
        converter: &mut AttributeConverter<R>,
    ) -> Result<Vec<ConvertedWorker>> {
        let profile = converter.profile().clone();
        let reporting = self.reporting_for(&profile);
        let query = store.prepare_query(&profile.source_table, &self.required_columns(&profile))?;

        let pass = self.scan_sources(store, &query, converter, reporting.histogram_bins)?;

        let mut workers = Vec::with_capacity(pass.rows);
        Self::scan_conversions(store, &query, converter, &pass.quantiles, |context, attributes| {
            let (worker_id, name) = identify(context, &reporting);
            workers.push(ConvertedWorker {
                worker_id,
                name,
                attributes: attributes.clone(),
            });
        })?;

        tracing::info!("Exported {} workers from '{}'", workers.len(), profile.source_table);
        Ok(workers)
    }

    /// Pass 1: quantile histograms over resolved values, stats over raw values
    fn scan_sources<R: Rng>(
        &self,
        store: &SourceStore,
        query: &SourceQuery,
        converter: &AttributeConverter<R>,
        stats_bins: usize,
    ) -> Result<SourcePass> {
        let profile = converter.profile();

        let mut histograms: NamedMap<QuantileHistogram> = profile
            .quantile_attributes()
            .map(|(id, _)| {
                let scale = profile.source_scale_for(id);
                let histogram =
                    QuantileHistogram::new(self.config.quantile_bins, scale.min as f64, scale.max as f64);
                (id, histogram)
            })
            .collect();

        let mut stats: NamedMap<AttributeStats> = profile
            .mappings
            .iter()
            .filter(|(_, mapping)| mapping.raw_field().is_some())
            .map(|(id, _)| {
                let scale = profile.source_scale_for(id);
                (id, AttributeStats::new(stats_bins, scale.min as f64, scale.max as f64))
            })
            .collect();

        let rows = store.scan(query, |context| {
            for (attribute, mapping) in profile.mappings.iter() {
                if let Some(histogram) = histograms.get_mut(attribute) {
                    if let Some(value) = converter.resolve_source_value(attribute, mapping, context) {
                        histogram.add(value);
                    }
                }

                let raw = mapping.raw_field().and_then(|field| context.try_get_number(field));
                if let (Some(value), Some(entry)) = (raw, stats.get_mut(attribute)) {
                    entry.add(value);
                }
            }
        })?;

        let mut quantiles = QuantileMaps::new();
        for (attribute, histogram) in histograms {
            let map = histogram.build();
            if map.is_empty() {
                tracing::debug!("No source values for '{}', quantile mapping falls back to linear", attribute);
            } else {
                tracing::debug!("Built quantile map for '{}'", attribute);
            }
            quantiles.insert(attribute, map);
        }

        tracing::info!(
            "Source pass read {} rows, built {} quantile maps",
            rows,
            quantiles.len()
        );

        Ok(SourcePass { quantiles, stats, rows })
    }

    /// Pass 2: convert every row against the built quantile maps
    fn scan_conversions<R, F>(
        store: &SourceStore,
        query: &SourceQuery,
        converter: &mut AttributeConverter<R>,
        quantiles: &QuantileMaps,
        mut visit: F,
    ) -> Result<usize>
    where
        R: Rng,
        F: FnMut(&WorkerContext, &AttributeSet),
    {
        store.scan(query, |context| {
            let attributes = converter.convert_worker(context, Some(quantiles));
            visit(context, &attributes);
        })
    }
}

/// Pretty-printed JSON to `path`
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    tracing::info!("Wrote {}", path.display());
    Ok(())
}

/// Worker id and space-joined display name from the reporting columns
fn identify(context: &WorkerContext, reporting: &ReportingSpec) -> (String, String) {
    let worker_id = context
        .try_get_string(&reporting.worker_id_field)
        .unwrap_or_default();
    let name = reporting
        .display_name_fields
        .iter()
        .filter_map(|field| context.try_get_string(field))
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (worker_id, name)
}

fn average(attributes: &AttributeSet) -> f64 {
    if attributes.is_empty() {
        return 0.0;
    }
    let sum: i64 = attributes.values().map(|&v| v as i64).sum();
    sum as f64 / attributes.len() as f64
}

/// Top and bottom `count` by average. Sorts are stable, so ties keep scan order.
fn rank_outliers(scores: Vec<WorkerScore>, count: usize) -> (Vec<WorkerScore>, Vec<WorkerScore>) {
    let mut high = scores.clone();
    high.sort_by_key(|score| Reverse(OrderedFloat(score.average)));
    high.truncate(count);

    let mut low = scores;
    low.sort_by_key(|score| OrderedFloat(score.average));
    low.truncate(count);

    (high, low)
}
