//! Data types used by the aggregation pipeline.

use serde::{Deserialize, Serialize};

use crate::record::TripRecord;

const SECONDS_PER_MINUTE: f64 = 60.0;
const METERS_PER_KILOMETRE: f64 = 1000.0;

/// Conversion applied to a raw record value before it is binned or summed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// Seconds, meters or counts as recorded.
    #[default]
    Raw,
    /// Seconds to minutes.
    Minutes,
    /// Meters to kilometres.
    Kilometres,
}

impl Unit {
    pub fn convert(self, value: f64) -> f64 {
        match self {
            Unit::Raw => value,
            Unit::Minutes => value / SECONDS_PER_MINUTE,
            Unit::Kilometres => value / METERS_PER_KILOMETRE,
        }
    }
}

/// A category member as retained for the per-vehicle breakdown.
/// Times are in minutes, distance in kilometres.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTrip {
    pub vehicle_id: String,
    pub duration: f64,
    pub waiting_time: f64,
    pub stop_time: f64,
    pub route_length: f64,
}

impl CategoryTrip {
    pub fn from_record(record: &TripRecord) -> Self {
        Self {
            vehicle_id: record.id.clone(),
            duration: Unit::Minutes.convert(record.duration),
            waiting_time: Unit::Minutes.convert(record.waiting_time),
            stop_time: Unit::Minutes.convert(record.stop_time),
            route_length: Unit::Kilometres.convert(record.route_length),
        }
    }

    /// Time spent on the road, i.e. not stopped for unloading.
    pub fn road_time(&self) -> f64 {
        self.duration - self.stop_time
    }
}

/// Running totals for one scope. Durations in minutes, distance in kilometres.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryAggregate {
    pub count: usize,
    pub duration: f64,
    pub route_length: f64,
    pub waiting_time: f64,
    pub stop_time: f64,
}

impl CategoryAggregate {
    pub fn add(&mut self, trip: &CategoryTrip) {
        self.count += 1;
        self.duration += trip.duration;
        self.route_length += trip.route_length;
        self.waiting_time += trip.waiting_time;
        self.stop_time += trip.stop_time;
    }

    pub fn merge(&mut self, other: &CategoryAggregate) {
        self.count += other.count;
        self.duration += other.duration;
        self.route_length += other.route_length;
        self.waiting_time += other.waiting_time;
        self.stop_time += other.stop_time;
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::trip;

    #[test]
    fn test_unit_conversions() {
        assert_eq!(Unit::Raw.convert(90.0), 90.0);
        assert_eq!(Unit::Minutes.convert(90.0), 1.5);
        assert_eq!(Unit::Kilometres.convert(2500.0), 2.5);
    }

    #[test]
    fn test_category_trip_converts_units() {
        let mut record = trip("delivery_1", 1800.0, 5000.0);
        record.stop_time = 600.0;
        record.waiting_time = 120.0;

        let t = CategoryTrip::from_record(&record);
        assert_eq!(t.duration, 30.0);
        assert_eq!(t.stop_time, 10.0);
        assert_eq!(t.waiting_time, 2.0);
        assert_eq!(t.route_length, 5.0);
        assert_eq!(t.road_time(), 20.0);
    }

    #[test]
    fn test_aggregate_add_and_merge() {
        let a_trip = CategoryTrip::from_record(&trip("a", 60.0, 1000.0));
        let b_trip = CategoryTrip::from_record(&trip("b", 120.0, 3000.0));

        let mut a = CategoryAggregate::default();
        a.add(&a_trip);
        let mut b = CategoryAggregate::default();
        b.add(&b_trip);
        a.merge(&b);

        assert_eq!(a.count, 2);
        assert_eq!(a.duration, 3.0);
        assert_eq!(a.route_length, 4.0);
        assert!(!a.is_empty());
        assert!(CategoryAggregate::default().is_empty());
    }
}
