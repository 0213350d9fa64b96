// Carbon footprint domain models
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ReferenceDataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorCategory {
    Energy,
    Transportation,
    General,
}

impl IndicatorCategory {
    pub const ALL: [IndicatorCategory; 3] = [
        IndicatorCategory::Energy,
        IndicatorCategory::Transportation,
        IndicatorCategory::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorCategory::Energy => "Energy",
            IndicatorCategory::Transportation => "Transportation",
            IndicatorCategory::General => "General",
        }
    }
}

impl FromStr for IndicatorCategory {
    type Err = ReferenceDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Stored category values carry trailing spaces ("Energy ")
        match s.trim().to_ascii_lowercase().as_str() {
            "energy" => Ok(IndicatorCategory::Energy),
            "transportation" => Ok(IndicatorCategory::Transportation),
            "general" => Ok(IndicatorCategory::General),
            _ => Err(ReferenceDataError::UnknownCategory(s.to_string())),
        }
    }
}

impl fmt::Display for IndicatorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A consumption item and its CO2-equivalent multiplier (kg per unit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionIndicator {
    pub name: String,
    pub category: IndicatorCategory,
    pub emission_factor: f64,
}

impl EmissionIndicator {
    pub fn new(name: impl Into<String>, category: IndicatorCategory, emission_factor: f64) -> Self {
        Self {
            name: name.into(),
            category,
            emission_factor,
        }
    }

    pub fn validate(&self) -> Result<(), ReferenceDataError> {
        if !self.emission_factor.is_finite() || self.emission_factor < 0.0 {
            return Err(ReferenceDataError::InvalidEmissionFactor {
                name: self.name.clone(),
                factor: self.emission_factor,
            });
        }
        Ok(())
    }

    pub fn matches(&self, name: &str) -> bool {
        self.name.trim() == name.trim()
    }

    /// Unit hint shown next to the input field.
    pub fn unit(&self) -> &'static str {
        if self.category == IndicatorCategory::Transportation {
            return "km";
        }
        let name = self.name.to_lowercase();
        if name.contains("electricity") {
            "kWh"
        } else if name.contains("gas") || name.contains("water") {
            "m³"
        } else {
            "units"
        }
    }
}

/// User-reported quantity for an energy or general indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootprintEntry {
    pub indicator_name: String,
    #[serde(deserialize_with = "lenient_quantity", default)]
    pub quantity: f64,
}

impl FootprintEntry {
    pub fn new(indicator_name: impl Into<String>, quantity: f64) -> Self {
        Self {
            indicator_name: indicator_name.into(),
            quantity,
        }
    }
}

/// One trip row from the transportation step. The mode may still be unset
/// while the user is filling the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportEntry {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(deserialize_with = "lenient_quantity", default)]
    pub distance: f64,
}

impl TransportEntry {
    pub fn new(mode: impl Into<String>, distance: f64) -> Self {
        Self {
            mode: Some(mode.into()),
            distance,
        }
    }

    pub fn as_entry(&self) -> Option<FootprintEntry> {
        self.mode
            .as_ref()
            .map(|mode| FootprintEntry::new(mode.clone(), self.distance))
    }
}

/// Accepts numbers or numeric strings; anything unparsable becomes zero.
fn lenient_quantity<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Missing(Option<()>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n,
        Raw::Text(s) => s.trim().parse().unwrap_or(0.0),
        Raw::Missing(_) => 0.0,
    })
}

/// User-selected reporting window. Either bound may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingPeriod {
    #[serde(rename = "fromDate", default)]
    pub from_date: Option<NaiveDate>,
    #[serde(rename = "toDate", default)]
    pub to_date: Option<NaiveDate>,
}

impl ReportingPeriod {
    pub fn new(from_date: NaiveDate, to_date: NaiveDate) -> Self {
        Self {
            from_date: Some(from_date),
            to_date: Some(to_date),
        }
    }

    pub fn is_ordered(&self) -> bool {
        match (self.from_date, self.to_date) {
            (Some(from), Some(to)) => from <= to,
            _ => true,
        }
    }
}

/// Per-category subtotals in kg CO2e, before period scaling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorySums {
    pub electricity: f64,
    pub transportation: f64,
    pub general: f64,
}

impl CategorySums {
    pub fn total(&self) -> f64 {
        self.electricity + self.transportation + self.general
    }
}

/// Period-scaled totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmissionTotals {
    pub kg: f64,
    pub tonnes: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FootprintClass {
    Excellent,
    Good,
    Moderate,
    Poor,
}

impl FootprintClass {
    pub const ALL: [FootprintClass; 4] = [
        FootprintClass::Excellent,
        FootprintClass::Good,
        FootprintClass::Moderate,
        FootprintClass::Poor,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FootprintClass::Excellent => "Excellent",
            FootprintClass::Good => "Good",
            FootprintClass::Moderate => "Moderate",
            FootprintClass::Poor => "Poor",
        }
    }

    pub fn tips(&self) -> &'static [&'static str] {
        match self {
            FootprintClass::Excellent => &[
                "Great job! You're an eco-champion.",
                "Maintain your low emissions by using energy-efficient devices.",
                "Spread awareness and help others reduce their footprint too.",
            ],
            FootprintClass::Good => &[
                "You're doing well! Just a little more effort.",
                "Consider reducing unnecessary car trips.",
                "Try plant-based meals once or twice a week.",
            ],
            FootprintClass::Moderate => &[
                "You're on the right path, but there's room to improve.",
                "Reduce single-use plastics and waste.",
                "Optimize your home's electricity and water usage.",
            ],
            FootprintClass::Poor => &[
                "Your footprint is high, but every action counts!",
                "Use public transportation or carpool when possible.",
                "Upgrade to energy-saving appliances and unplug unused electronics.",
                "Track and minimize online shopping and overconsumption.",
            ],
        }
    }
}

impl FromStr for FootprintClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FootprintClass::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown classification: {}", s))
    }
}

impl fmt::Display for FootprintClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reference per-capita footprint, compared against the user's total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benchmark {
    pub label: String,
    /// Annual tonnes CO2e.
    pub annual_tonnes: f64,
    /// Annual figure scaled to the reporting period.
    pub period_tonnes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootprintResult {
    pub electricity_emission: f64,
    pub transportation_emission: f64,
    pub general_emission: f64,
    pub total_emissions_kg: f64,
    pub total_emissions_tonnes: f64,
    pub classification: FootprintClass,
    pub period_days: u32,
}

/// A saved wizard result, keyed by user and creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootprintRecord {
    pub id: String,
    pub user_id: String,
    pub period: ReportingPeriod,
    pub electricity_emission: f64,
    pub transportation_emission: f64,
    pub general_emission: f64,
    /// Total tonnes, formatted to three decimals when saved.
    pub calculated_value: String,
    pub created_at: DateTime<Utc>,
}
