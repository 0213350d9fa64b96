// Air quality domain models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::error::ReferenceDataError;

/// Pollutants the dashboard rates. Breakpoint rows reference them by code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Pollutant {
    #[serde(rename = "CO2")]
    Co2,
    #[serde(rename = "CO")]
    Co,
    #[serde(rename = "VOC")]
    Voc,
}

impl Pollutant {
    pub const TRACKED: [Pollutant; 3] = [Pollutant::Co2, Pollutant::Co, Pollutant::Voc];

    pub fn code(&self) -> &'static str {
        match self {
            Pollutant::Co2 => "CO2",
            Pollutant::Co => "CO",
            Pollutant::Voc => "VOC",
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One linear segment of a pollutant's concentration-to-index mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutantBreakpoint {
    pub gas_name: String,
    pub concentration_low: f64,
    pub concentration_high: f64,
    pub index_low: f64,
    pub index_high: f64,
}

impl PollutantBreakpoint {
    pub fn new(
        gas_name: impl Into<String>,
        concentration_low: f64,
        concentration_high: f64,
        index_low: f64,
        index_high: f64,
    ) -> Self {
        Self {
            gas_name: gas_name.into(),
            concentration_low,
            concentration_high,
            index_low,
            index_high,
        }
    }

    /// Source tables carry stray whitespace around names, so matching trims.
    pub fn is_for(&self, gas: &str) -> bool {
        self.gas_name.trim() == gas.trim()
    }

    pub fn contains(&self, concentration: f64) -> bool {
        concentration >= self.concentration_low && concentration <= self.concentration_high
    }

    /// Ingestion check: every row must span a non-empty, ordered range.
    pub fn validate(&self) -> Result<(), ReferenceDataError> {
        if !self.concentration_low.is_finite() || !self.concentration_high.is_finite() {
            return Err(ReferenceDataError::NonFiniteBound {
                gas: self.gas_name.clone(),
            });
        }
        if self.concentration_high < self.concentration_low {
            return Err(ReferenceDataError::InvertedRange {
                gas: self.gas_name.clone(),
                low: self.concentration_low,
                high: self.concentration_high,
            });
        }
        if self.concentration_high == self.concentration_low {
            return Err(ReferenceDataError::DegenerateRange {
                gas: self.gas_name.clone(),
                bound: self.concentration_low,
            });
        }
        Ok(())
    }
}

/// Point-in-time measurement pushed by the sensor device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Heartbeat time, refreshed even when no new measurements are pushed.
    pub timestamp: DateTime<Utc>,
    /// Time of the last full measurement push, if the device has sent one.
    #[serde(default)]
    pub last_data_push: Option<DateTime<Utc>>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub concentrations: BTreeMap<Pollutant, f64>,
}

impl SensorReading {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            last_data_push: None,
            temperature: None,
            humidity: None,
            concentrations: BTreeMap::new(),
        }
    }

    pub fn with_concentration(mut self, pollutant: Pollutant, value: f64) -> Self {
        self.concentrations.insert(pollutant, value);
        self
    }

    pub fn with_data_push(mut self, at: DateTime<Utc>) -> Self {
        self.last_data_push = Some(at);
        self
    }

    pub fn with_climate(mut self, temperature: f64, humidity: f64) -> Self {
        self.temperature = Some(temperature);
        self.humidity = Some(humidity);
        self
    }

    pub fn concentration(&self, pollutant: Pollutant) -> Option<f64> {
        self.concentrations.get(&pollutant).copied()
    }

    /// A reading only carries measurements once the device has pushed a
    /// full set of them.
    pub fn has_measurements(&self) -> bool {
        self.last_data_push.is_some()
            && Pollutant::TRACKED
                .iter()
                .all(|p| self.concentrations.contains_key(p))
    }

    /// The measurements of this reading as log entries stamped with the
    /// data push time. Empty until the device has pushed.
    pub fn samples(&self) -> Vec<GasSample> {
        let Some(at) = self.last_data_push else {
            return Vec::new();
        };
        self.concentrations
            .iter()
            .map(|(pollutant, value)| GasSample::new(at, pollutant.code(), *value))
            .collect()
    }
}

/// One archived gas measurement from the sensor log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasSample {
    pub recorded_at: DateTime<Utc>,
    pub gas_name: String,
    pub value: f64,
}

impl GasSample {
    pub fn new(recorded_at: DateTime<Utc>, gas_name: impl Into<String>, value: f64) -> Self {
        Self {
            recorded_at,
            gas_name: gas_name.into(),
            value,
        }
    }

    pub fn is_gas(&self, gas: &str) -> bool {
        self.gas_name.trim().eq_ignore_ascii_case(gas.trim())
    }

    /// VOC is logged in ppb, every other gas in ppm.
    pub fn unit(&self) -> &'static str {
        if self.is_gas("VOC") { "ppb" } else { "ppm" }
    }
}

/// Composite index bucket shown on the dashboard gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AqiCategory {
    VeryGood,
    Good,
    Fair,
    Poor,
    VeryPoor,
    Hazardous,
}

impl AqiCategory {
    pub fn label(&self) -> &'static str {
        match self {
            AqiCategory::VeryGood => "Very Good",
            AqiCategory::Good => "Good",
            AqiCategory::Fair => "Fair",
            AqiCategory::Poor => "Poor",
            AqiCategory::VeryPoor => "Very Poor",
            AqiCategory::Hazardous => "Hazardous",
        }
    }

    pub fn advisory(&self) -> &'static str {
        match self {
            AqiCategory::VeryGood => "Enjoy the fresh air!",
            AqiCategory::Good => "Keep windows open.",
            AqiCategory::Fair => "Limit outdoor activity.",
            AqiCategory::Poor => "Avoid outdoor exposure.",
            AqiCategory::VeryPoor => "Stay indoors with air purifiers.",
            AqiCategory::Hazardous => "Health alert! Remain inside.",
        }
    }
}

impl fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
