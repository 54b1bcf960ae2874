//! Source store access and the attribute report

pub mod generator;
pub mod source;
pub mod stats;

pub use generator::{
    write_json, AttributeReport, ConvertedWorker, ReportGenerator, ReportSection, WorkerScore,
};
pub use source::{build_select, SourceQuery, SourceStore};
pub use stats::AttributeStats;
