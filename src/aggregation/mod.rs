//! Single-pass aggregation of trip records.
//!
//! One pass fills a configurable set of histograms over every record, a
//! second set over the members of a category (delivery vehicles by default),
//! and running totals for both scopes. The cost model turns a scope's totals
//! into personnel and fuel cost.

pub mod classifier;
pub mod cost;
pub mod histogram;
pub mod pipeline;
pub mod types;
pub mod utility;

pub use classifier::{PrefixClassifier, RecordClassifier};
pub use cost::{CostRates, CostSummary, compute_cost};
pub use histogram::{BinSnapshot, Histogram};
pub use pipeline::{NamedHistogram, Pipeline, PipelineResult, run, run_sharded};
pub use types::{CategoryAggregate, CategoryTrip, Unit};
