use serde::{Deserialize, Serialize};

use crate::aggregation::types::CategoryAggregate;

/// Unit costs for the operating-cost estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostRates {
    #[serde(default = "default_labor_rate")]
    pub labor_rate_per_hour: f64,
    #[serde(default = "default_fuel_consumption")]
    pub fuel_liters_per_100: f64,
    #[serde(default = "default_fuel_price")]
    pub fuel_price_per_liter: f64,
}

fn default_labor_rate() -> f64 {
    15.0
}
fn default_fuel_consumption() -> f64 {
    10.0
}
fn default_fuel_price() -> f64 {
    1.5
}

impl Default for CostRates {
    fn default() -> Self {
        Self {
            labor_rate_per_hour: default_labor_rate(),
            fuel_liters_per_100: default_fuel_consumption(),
            fuel_price_per_liter: default_fuel_price(),
        }
    }
}

impl CostRates {
    pub fn apply(&self, aggregate: &CategoryAggregate) -> CostSummary {
        compute_cost(
            aggregate,
            self.labor_rate_per_hour,
            self.fuel_liters_per_100,
            self.fuel_price_per_liter,
        )
    }
}

/// Derived operating cost of a category. Values keep full precision; round
/// only when presenting them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CostSummary {
    pub total_duration_hours: f64,
    pub personnel_cost: f64,
    pub total_route_length_km: f64,
    pub fuel_cost: f64,
    pub total_cost: f64,
}

/// Maps aggregated durations (minutes) and route lengths (km) to personnel
/// and fuel cost. An empty aggregate costs nothing.
pub fn compute_cost(
    aggregate: &CategoryAggregate,
    labor_rate_per_hour: f64,
    fuel_liters_per_100: f64,
    fuel_price_per_liter: f64,
) -> CostSummary {
    if aggregate.is_empty() {
        return CostSummary::default();
    }

    let total_duration_hours = aggregate.duration / 60.0;
    let personnel_cost = total_duration_hours * labor_rate_per_hour;
    let total_route_length_km = aggregate.route_length;
    let fuel_cost = total_route_length_km * fuel_liters_per_100 / 100.0 * fuel_price_per_liter;

    CostSummary {
        total_duration_hours,
        personnel_cost,
        total_route_length_km,
        fuel_cost,
        total_cost: personnel_cost + fuel_cost,
    }
}
