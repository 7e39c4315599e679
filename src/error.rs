//! Error types shared by the record source, the pipeline and its configuration.

use thiserror::Error;

use crate::aggregation::types::Unit;

/// Invalid pipeline or histogram configuration. Raised at construction time,
/// never deferred to the first `add`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("histogram needs at least one bin, got {bins}")]
    ZeroBins { bins: usize },
    #[error("histogram domain maximum must be positive and finite, got {max}")]
    InvalidMax { max: f64 },
    #[error("cannot merge histogram with {other_bins} bins over [0, {other_max}) into {bins} bins over [0, {max})")]
    ShapeMismatch {
        bins: usize,
        max: f64,
        other_bins: usize,
        other_max: f64,
    },
    #[error("histogram {name:?} covers every record and must bin raw values, got unit {unit:?}")]
    ConvertedAllScope { name: String, unit: Unit },
    #[error("duplicate histogram name {name:?}")]
    DuplicateHistogram { name: String },
    #[error("cannot merge results of differently configured pipelines: {reason}")]
    LayoutMismatch { reason: String },
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a single aggregation pass. The pass is fail-fast: the first
/// offending record aborts the run.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("malformed record #{index} ({id}): {reason}")]
    MalformedRecord {
        index: usize,
        id: String,
        reason: String,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failure while loading or decoding a record source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read source: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to fetch source: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid source url: {0}")]
    Url(String),
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },
    #[error("malformed JSON records: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("unknown record format {0:?}, expected csv, json or xml")]
    UnknownFormat(String),
}

pub type Result<T, E = AggregationError> = std::result::Result<T, E>;
