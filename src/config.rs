//! Pipeline configuration.
//!
//! Stored as a JSON object on disk; every key is optional and falls back to
//! the defaults below:
//! ```json
//! {
//!   "category": { "name": "delivery", "prefix": "delivery" },
//!   "all_histograms": [
//!     { "name": "duration", "title": "Duration Histogram", "x_label": "Duration (s)",
//!       "field": "duration", "bins": 400, "max": 2000.0 }
//!   ],
//!   "cost": { "labor_rate_per_hour": 15.0 }
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aggregation::cost::CostRates;
use crate::aggregation::types::Unit;
use crate::error::ConfigError;
use crate::record::Field;

/// The records tracked as their own category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    #[serde(default = "default_category_name")]
    pub name: String,
    #[serde(default = "default_category_name")]
    pub prefix: String,
}

fn default_category_name() -> String {
    "delivery".into()
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            name: default_category_name(),
            prefix: default_category_name(),
        }
    }
}

/// One histogram to fill during the pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSpec {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub x_label: String,
    pub field: Field,
    #[serde(default)]
    pub unit: Unit,
    pub bins: usize,
    pub max: f64,
}

impl HistogramSpec {
    pub fn new(name: &str, title: &str, x_label: &str, field: Field, bins: usize, max: f64) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            x_label: x_label.into(),
            field,
            unit: Unit::Raw,
            bins,
            max,
        }
    }

    pub fn in_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub category: CategoryConfig,
    /// Filled from raw values of every record.
    #[serde(default = "default_all_histograms")]
    pub all_histograms: Vec<HistogramSpec>,
    /// Filled from category members only, after unit conversion.
    #[serde(default = "default_category_histograms")]
    pub category_histograms: Vec<HistogramSpec>,
    #[serde(default)]
    pub cost: CostRates,
}

fn default_all_histograms() -> Vec<HistogramSpec> {
    vec![
        HistogramSpec::new("duration", "Duration Histogram", "Duration (s)", Field::Duration, 400, 2000.0),
        HistogramSpec::new(
            "waiting_time",
            "Waiting Time Histogram",
            "Waiting Time (s)",
            Field::WaitingTime,
            400,
            2000.0,
        ),
        HistogramSpec::new("reroutes", "Reroute Histogram", "Reroute No.", Field::RerouteNo, 10, 10.0),
    ]
}

fn default_category_histograms() -> Vec<HistogramSpec> {
    vec![
        HistogramSpec::new(
            "duration",
            "Accumulated Delivery Duration Histogram",
            "Duration (s)",
            Field::Duration,
            25,
            50000.0,
        ),
        HistogramSpec::new(
            "waiting_time",
            "Accumulated Traffic Waiting Time Histogram for Delivery Vehicles",
            "Waiting Time (s)",
            Field::WaitingTime,
            25,
            2000.0,
        ),
        HistogramSpec::new(
            "stop_time",
            "Delivery Stop Time Histogram",
            "Stop Time (min)",
            Field::StopTime,
            25,
            500.0,
        )
        .in_unit(Unit::Minutes),
    ]
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            category: CategoryConfig::default(),
            all_histograms: default_all_histograms(),
            category_histograms: default_category_histograms(),
            cost: CostRates::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects duplicate histogram names within a scope and unit conversions
    /// on histograms covering every record. Histogram shapes are checked when
    /// the pipeline builds them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(spec) = self.all_histograms.iter().find(|h| h.unit != Unit::Raw) {
            return Err(ConfigError::ConvertedAllScope {
                name: spec.name.clone(),
                unit: spec.unit,
            });
        }

        for specs in [&self.all_histograms, &self.category_histograms] {
            let mut seen = HashSet::new();
            for spec in specs {
                if !seen.insert(spec.name.as_str()) {
                    return Err(ConfigError::DuplicateHistogram {
                        name: spec.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
