//! Air quality index computation.
//!
//! Converts raw pollutant concentrations into sub-indices on a common
//! 0-500 scale using piecewise-linear breakpoint tables, and reduces them
//! to a composite index by taking the worst offender. Everything here is
//! pure; breakpoint tables and readings are supplied by the caller.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

use crate::domain::air_quality::{AqiCategory, Pollutant, PollutantBreakpoint, SensorReading};

/// Heartbeat age (seconds) beyond which the device is treated as disconnected.
pub const DEFAULT_STALENESS_TOLERANCE_SECS: i64 = 90;

/// Calculate the sub-index for one pollutant concentration.
///
/// # Arguments
///
/// * `gas` - Pollutant code the rows are filtered by (e.g. "CO2")
/// * `concentration` - Raw concentration reported by the sensor
/// * `breakpoints` - The full breakpoint table, any gas
///
/// # Returns
///
/// The interpolated index from the first row (in table order) whose
/// inclusive range contains `concentration`, or `0.0` when no row
/// matches. A zero-width row yields its `index_low`.
///
/// # Examples
///
/// ```
/// use naqa::application::aqi_engine::sub_index;
/// use naqa::domain::air_quality::PollutantBreakpoint;
///
/// let table = vec![PollutantBreakpoint::new("CO2", 0.0, 1000.0, 0.0, 100.0)];
/// assert_eq!(sub_index("CO2", 500.0, &table), 50.0);
/// assert_eq!(sub_index("CO", 500.0, &table), 0.0);
/// ```
pub fn sub_index(gas: &str, concentration: f64, breakpoints: &[PollutantBreakpoint]) -> f64 {
    let Some(row) = breakpoints
        .iter()
        .filter(|row| row.is_for(gas))
        .find(|row| row.contains(concentration))
    else {
        return 0.0;
    };

    let span = row.concentration_high - row.concentration_low;
    if span == 0.0 {
        return row.index_low;
    }

    (concentration - row.concentration_low) / span * (row.index_high - row.index_low)
        + row.index_low
}

/// Sub-index for every tracked pollutant present in the reading.
/// Pollutants missing from the reading are left out.
pub fn sub_indices(
    reading: &SensorReading,
    breakpoints: &[PollutantBreakpoint],
) -> BTreeMap<Pollutant, f64> {
    Pollutant::TRACKED
        .iter()
        .filter_map(|&pollutant| {
            reading
                .concentration(pollutant)
                .map(|value| (pollutant, sub_index(pollutant.code(), value, breakpoints)))
        })
        .collect()
}

/// Composite index: the maximum tracked sub-index, rounded to the nearest
/// integer. Never negative; values above 500 are passed through for the
/// display to clamp.
pub fn composite_index(reading: &SensorReading, breakpoints: &[PollutantBreakpoint]) -> u32 {
    reduce_sub_indices(sub_indices(reading, breakpoints).values().copied())
}

pub(crate) fn reduce_sub_indices(values: impl IntoIterator<Item = f64>) -> u32 {
    let worst = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    worst.round() as u32
}

/// Map a composite index onto its display bucket.
pub fn classify_index(value: u32) -> AqiCategory {
    match value {
        0..=50 => AqiCategory::VeryGood,
        51..=100 => AqiCategory::Good,
        101..=200 => AqiCategory::Fair,
        201..=300 => AqiCategory::Poor,
        301..=400 => AqiCategory::VeryPoor,
        _ => AqiCategory::Hazardous,
    }
}

/// A reading is live while its heartbeat lies within `tolerance` of `now`,
/// on either side. A heartbeat from further in the future means a skewed or
/// misread clock and never counts.
pub fn is_live(reading: Option<&SensorReading>, now: DateTime<Utc>, tolerance: Duration) -> bool {
    reading.is_some_and(|r| {
        let age = now - r.timestamp;
        age < tolerance && -age < tolerance
    })
}

/// Tracked pollutants the table has no rows for at all.
pub fn unrated_pollutants(breakpoints: &[PollutantBreakpoint]) -> Vec<Pollutant> {
    Pollutant::TRACKED
        .into_iter()
        .filter(|p| !breakpoints.iter().any(|row| row.is_for(p.code())))
        .collect()
}
