//! Trip records as produced by a traffic simulation's trip-info output.

use serde::{Deserialize, Serialize};

/// One finished vehicle journey.
///
/// Header names follow the simulator's attribute names (`routeLength`,
/// `waitingTime`, ...). The `tripinfo_`-prefixed columns written by CSV
/// converters and plain snake_case names are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRecord {
    #[serde(alias = "tripinfo_id")]
    pub id: String,
    #[serde(alias = "tripinfo_depart")]
    pub depart: f64,
    #[serde(alias = "tripinfo_arrival")]
    pub arrival: f64,
    #[serde(alias = "tripinfo_duration")]
    pub duration: f64,
    #[serde(alias = "tripinfo_routeLength", alias = "route_length")]
    pub route_length: f64,
    #[serde(alias = "tripinfo_waitingTime", alias = "waiting_time")]
    pub waiting_time: f64,
    #[serde(alias = "tripinfo_timeLoss", alias = "time_loss")]
    pub time_loss: f64,
    #[serde(alias = "tripinfo_stopTime", alias = "stop_time")]
    pub stop_time: f64,
    #[serde(alias = "tripinfo_rerouteNo", alias = "reroute_no")]
    pub reroute_no: u32,
}

/// A scalar column of a [`TripRecord`] that can feed a histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Depart,
    Arrival,
    Duration,
    RouteLength,
    WaitingTime,
    TimeLoss,
    StopTime,
    RerouteNo,
}

impl TripRecord {
    /// Returns the raw value of `field` (seconds, meters or a count).
    pub fn value(&self, field: Field) -> f64 {
        match field {
            Field::Depart => self.depart,
            Field::Arrival => self.arrival,
            Field::Duration => self.duration,
            Field::RouteLength => self.route_length,
            Field::WaitingTime => self.waiting_time,
            Field::TimeLoss => self.time_loss,
            Field::StopTime => self.stop_time,
            Field::RerouteNo => self.reroute_no as f64,
        }
    }

    /// Checks the invariants the aggregation relies on.
    ///
    /// `arrival < depart` is deliberately not checked; such records are
    /// aggregated as they are.
    pub fn validate(&self) -> Result<(), String> {
        let checks = [
            ("duration", self.duration),
            ("routeLength", self.route_length),
            ("waitingTime", self.waiting_time),
        ];
        for (name, value) in checks {
            if !value.is_finite() {
                return Err(format!("{name} is not finite ({value})"));
            }
            if value < 0.0 {
                return Err(format!("{name} is negative ({value})"));
            }
        }

        let finite = [
            ("depart", self.depart),
            ("arrival", self.arrival),
            ("timeLoss", self.time_loss),
            ("stopTime", self.stop_time),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(format!("{name} is not finite ({value})"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn trip(id: &str, duration: f64, route_length: f64) -> TripRecord {
    TripRecord {
        id: id.to_string(),
        depart: 0.0,
        arrival: duration,
        duration,
        route_length,
        waiting_time: 0.0,
        time_loss: 0.0,
        stop_time: 0.0,
        reroute_no: 0,
    }
}
