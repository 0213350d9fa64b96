// Dashboard domain model
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::air_quality::{AqiCategory, Pollutant};

/// Rated view of the latest reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AqiSummary {
    pub value: u32,
    pub category: AqiCategory,
    pub label: &'static str,
    pub advisory: &'static str,
    pub sub_indices: BTreeMap<Pollutant, f64>,
}

impl AqiSummary {
    pub fn new(value: u32, category: AqiCategory, sub_indices: BTreeMap<Pollutant, f64>) -> Self {
        Self {
            value,
            category,
            label: category.label(),
            advisory: category.advisory(),
            sub_indices,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub connected: bool,
    pub aqi: Option<AqiSummary>,
    pub temperature: Option<i64>,
    pub humidity: Option<i64>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Tracked pollutants with no breakpoint rows; their sub-index is zero.
    pub unrated_pollutants: Vec<Pollutant>,
}

impl DashboardSnapshot {
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            aqi: None,
            temperature: None,
            humidity: None,
            last_updated: None,
            unrated_pollutants: Vec::new(),
        }
    }
}
