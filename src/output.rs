//! Report building and output.
//!
//! A [`Report`] carries everything a chart renderer needs (histogram bins,
//! per-vehicle breakdown, time split) and is written as JSON. The human
//! readable summary and the per-source CSV log are derived from it.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::debug;

use crate::aggregation::types::{CategoryAggregate, CategoryTrip, Unit};
use crate::aggregation::utility::{pct, round2};
use crate::aggregation::{BinSnapshot, CostRates, CostSummary, NamedHistogram, PipelineResult};

/// Chart-ready view of one histogram.
#[derive(Debug, Clone, Serialize)]
pub struct HistogramChart {
    pub name: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub unit: Unit,
    pub bin_width: f64,
    pub max: f64,
    pub max_count: u64,
    pub offered: u64,
    pub dropped: u64,
    pub bins: Vec<BinSnapshot>,
}

impl From<&NamedHistogram> for HistogramChart {
    fn from(h: &NamedHistogram) -> Self {
        Self {
            name: h.spec.name.clone(),
            title: h.spec.title.clone(),
            x_label: h.spec.x_label.clone(),
            y_label: "Frequency".into(),
            unit: h.spec.unit,
            bin_width: h.histogram.width(),
            max: h.histogram.max(),
            max_count: h.histogram.max_count(),
            offered: h.histogram.offered(),
            dropped: h.histogram.dropped(),
            bins: h.histogram.snapshot(),
        }
    }
}

/// Per-vehicle bar chart entry, in minutes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleBreakdown {
    pub vehicle_id: String,
    pub road_time: f64,
    pub unload_time: f64,
    pub waiting_time: f64,
}

impl From<&CategoryTrip> for VehicleBreakdown {
    fn from(t: &CategoryTrip) -> Self {
        Self {
            vehicle_id: t.vehicle_id.clone(),
            road_time: t.road_time(),
            unload_time: t.stop_time,
            waiting_time: t.waiting_time,
        }
    }
}

/// Where a category's time went, in minutes. Driving excludes time spent
/// waiting in traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TimeSplit {
    pub driving: f64,
    pub waiting_in_traffic: f64,
    pub unloading: f64,
}

impl TimeSplit {
    pub fn from_trips(trips: &[CategoryTrip]) -> Self {
        let road: f64 = trips.iter().map(CategoryTrip::road_time).sum();
        let waiting: f64 = trips.iter().map(|t| t.waiting_time).sum();
        let unloading: f64 = trips.iter().map(|t| t.stop_time).sum();

        Self {
            driving: road - waiting,
            waiting_in_traffic: waiting,
            unloading,
        }
    }

    pub fn total(&self) -> f64 {
        self.driving + self.waiting_in_traffic + self.unloading
    }

    /// Percentages for a pie chart, in `driving, waiting, unloading` order.
    pub fn shares(&self) -> [f64; 3] {
        let total = self.total();
        [
            pct(self.driving, total),
            pct(self.waiting_in_traffic, total),
            pct(self.unloading, total),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub name: String,
    pub totals: CategoryAggregate,
    pub rates: CostRates,
    pub cost: CostSummary,
    pub vehicles: Vec<VehicleBreakdown>,
    pub time_split: TimeSplit,
}

/// Final output of one analysed source.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub totals: CategoryAggregate,
    pub all_histograms: Vec<HistogramChart>,
    pub category_histograms: Vec<HistogramChart>,
    pub category: CategoryReport,
}

impl Report {
    pub fn build(source: &str, result: &PipelineResult, rates: &CostRates) -> Self {
        Self {
            source: source.to_string(),
            generated_at: Utc::now(),
            totals: result.all.clone(),
            all_histograms: result.all_histograms.iter().map(HistogramChart::from).collect(),
            category_histograms: result
                .category_histograms
                .iter()
                .map(HistogramChart::from)
                .collect(),
            category: CategoryReport {
                name: result.category_name.clone(),
                totals: result.category.clone(),
                rates: *rates,
                cost: rates.apply(&result.category),
                vehicles: result.members.iter().map(VehicleBreakdown::from).collect(),
                time_split: TimeSplit::from_trips(&result.members),
            },
        }
    }
}

/// Writes the cost summary of `report` as human readable lines.
pub fn write_summary<W: Write>(w: &mut W, report: &Report) -> std::io::Result<()> {
    let category = &report.category;
    let cost = &category.cost;

    writeln!(w)?;
    writeln!(w, "File Name: {}", report.source)?;
    writeln!(w, "Total Records: {}", report.totals.count)?;
    writeln!(
        w,
        "Total {} Vehicles: {}",
        capitalize(&category.name),
        category.totals.count
    )?;
    writeln!(w, "Total Duration: {:.2} hours", round2(cost.total_duration_hours))?;
    writeln!(w, "Personnel Cost: {:.2} EUR", round2(cost.personnel_cost))?;
    writeln!(w, "Total Route Length: {:.2} km", round2(cost.total_route_length_km))?;
    writeln!(
        w,
        "Theoretical Fuel Cost: {:.2} EUR ({}L/100km, {}EUR/L)",
        round2(cost.fuel_cost),
        category.rates.fuel_liters_per_100,
        category.rates.fuel_price_per_liter,
    )?;
    writeln!(w, "Total Cost: {:.2} EUR", round2(cost.total_cost))?;

    let [driving, waiting, unloading] = category.time_split.shares();
    writeln!(
        w,
        "Time Split: driving {driving:.1}%, waiting in traffic {waiting:.1}%, unloading {unloading:.1}%"
    )?;
    Ok(())
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Serializes `report` as pretty-printed JSON.
pub fn write_report_json<W: Write>(w: W, report: &Report) -> Result<()> {
    serde_json::to_writer_pretty(w, report)?;
    Ok(())
}

/// One line of the per-source summary log.
#[derive(Debug, Serialize)]
pub struct SummaryRow {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub category: String,
    pub records: usize,
    pub members: usize,
    pub total_duration_hours: f64,
    pub personnel_cost: f64,
    pub total_route_length_km: f64,
    pub fuel_cost: f64,
    pub total_cost: f64,
}

impl From<&Report> for SummaryRow {
    fn from(report: &Report) -> Self {
        let cost = &report.category.cost;
        Self {
            generated_at: report.generated_at,
            source: report.source.clone(),
            category: report.category.name.clone(),
            records: report.totals.count,
            members: report.category.totals.count,
            total_duration_hours: cost.total_duration_hours,
            personnel_cost: cost.personnel_cost,
            total_route_length_km: cost.total_route_length_km,
            fuel_cost: cost.fuel_cost,
            total_cost: cost.total_cost,
        }
    }
}

/// Appends `row` to the summary log at `path`. The header row is written
/// only when the file is new, so runs over different sources share one log.
pub fn append_summary_record(path: &str, row: &SummaryRow) -> Result<()> {
    let new_file = !Path::new(path).exists();
    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new().has_headers(new_file).from_writer(file);
    writer.serialize(row)?;
    writer.flush()?;

    debug!(path, new_file, source = %row.source, "Summary row appended");
    Ok(())
}
