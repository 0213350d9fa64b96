//! Carbon footprint aggregation and classification.
//!
//! Turns wizard input into per-category subtotals, scales the total to the
//! reporting period and classifies it against period-scaled thresholds.
//! Pure functions only; indicator tables come from the caller.

use chrono::NaiveDate;

use crate::domain::footprint::{
    Benchmark, CategorySums, EmissionIndicator, EmissionTotals, FootprintClass, FootprintEntry,
    FootprintResult, ReportingPeriod,
};

const DAYS_PER_YEAR: f64 = 365.0;
const KG_PER_TONNE: f64 = 1000.0;

/// Annual tonnes CO2e below which each bucket applies.
const EXCELLENT_BELOW: f64 = 3.0;
const GOOD_BELOW: f64 = 7.0;
const MODERATE_BELOW: f64 = 12.0;

pub const GLOBAL_AVERAGE_TONNES: f64 = 4.7;
pub const NATIONAL_AVERAGE_TONNES: f64 = 9.5;
pub const NATIONAL_AVERAGE_LABEL: &str = "Saudi Arabia Average";

/// Negative, NaN and infinite input counts as nothing entered.
pub fn sanitize_quantity(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Sum of quantity x emission factor over the entries of one category.
///
/// Entries whose name matches no indicator contribute nothing. Invalid
/// quantities are floored at zero before multiplying.
pub fn category_sum(entries: &[FootprintEntry], indicators: &[EmissionIndicator]) -> f64 {
    entries
        .iter()
        .filter_map(|entry| {
            indicators
                .iter()
                .find(|indicator| indicator.matches(&entry.indicator_name))
                .map(|indicator| {
                    sanitize_quantity(entry.quantity) * sanitize_quantity(indicator.emission_factor)
                })
        })
        .sum()
}

/// Inclusive day count between two dates, order-independent, at least 1.
pub fn period_days(from_date: NaiveDate, to_date: NaiveDate) -> u32 {
    let days = (to_date - from_date).num_days().unsigned_abs();
    u32::try_from(days.saturating_add(1)).unwrap_or(u32::MAX)
}

/// Day count for a possibly incomplete period; missing bounds mean one day.
pub fn reporting_days(period: &ReportingPeriod) -> u32 {
    match (period.from_date, period.to_date) {
        (Some(from), Some(to)) => period_days(from, to),
        _ => 1,
    }
}

fn period_scale(period_days: u32) -> f64 {
    f64::from(period_days.max(1)) / DAYS_PER_YEAR
}

/// Scale the raw category sums to the reporting period.
pub fn total_emissions(sums: &CategorySums, period_days: u32) -> EmissionTotals {
    let kg = sums.total() * period_scale(period_days);
    EmissionTotals {
        kg,
        tonnes: kg / KG_PER_TONNE,
    }
}

/// Bucket a period total. Thresholds shrink with the period, and a value
/// sitting exactly on a threshold lands in the worse bucket.
pub fn classify(total_tonnes: f64, period_days: u32) -> FootprintClass {
    let scale = period_scale(period_days);
    if total_tonnes < EXCELLENT_BELOW * scale {
        FootprintClass::Excellent
    } else if total_tonnes < GOOD_BELOW * scale {
        FootprintClass::Good
    } else if total_tonnes < MODERATE_BELOW * scale {
        FootprintClass::Moderate
    } else {
        FootprintClass::Poor
    }
}

/// Global and national averages scaled to the same period as the total.
pub fn benchmarks(period_days: u32) -> Vec<Benchmark> {
    let scale = period_scale(period_days);
    [
        ("Global Average", GLOBAL_AVERAGE_TONNES),
        (NATIONAL_AVERAGE_LABEL, NATIONAL_AVERAGE_TONNES),
    ]
    .into_iter()
    .map(|(label, annual)| Benchmark {
        label: label.to_string(),
        annual_tonnes: annual,
        period_tonnes: annual * scale,
    })
    .collect()
}

/// Full result for one wizard submission.
pub fn compute(sums: CategorySums, period_days: u32) -> FootprintResult {
    let totals = total_emissions(&sums, period_days);
    FootprintResult {
        electricity_emission: sums.electricity,
        transportation_emission: sums.transportation,
        general_emission: sums.general,
        total_emissions_kg: totals.kg,
        total_emissions_tonnes: totals.tonnes,
        classification: classify(totals.tonnes, period_days),
        period_days,
    }
}

pub fn format_kg(kg: f64) -> String {
    format!("{:.2}", kg)
}

pub fn format_tonnes(tonnes: f64) -> String {
    format!("{:.3}", tonnes)
}
