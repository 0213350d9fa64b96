// Reference tables loaded from a local TOML document
use crate::application::reference_repository::ReferenceRepository;
use crate::domain::air_quality::PollutantBreakpoint;
use crate::domain::footprint::{EmissionIndicator, IndicatorCategory};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ReferenceDocument {
    #[serde(default)]
    breakpoints: Vec<PollutantBreakpoint>,
    #[serde(default)]
    indicators: Vec<IndicatorRow>,
}

#[derive(Debug, Deserialize)]
struct IndicatorRow {
    name: String,
    category: String,
    emission_factor: f64,
}

#[derive(Debug, Clone, Default)]
pub struct StaticReferenceRepository {
    breakpoints: Vec<PollutantBreakpoint>,
    indicators: Vec<EmissionIndicator>,
}

impl StaticReferenceRepository {
    /// Build from already-parsed rows. Rows failing validation are dropped.
    pub fn new(breakpoints: Vec<PollutantBreakpoint>, indicators: Vec<EmissionIndicator>) -> Self {
        let breakpoints = breakpoints
            .into_iter()
            .filter(|row| match row.validate() {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Dropping breakpoint row: {}", e);
                    false
                }
            })
            .collect();

        let indicators = indicators
            .into_iter()
            .filter(|indicator| match indicator.validate() {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Dropping indicator row: {}", e);
                    false
                }
            })
            .collect();

        Self {
            breakpoints,
            indicators,
        }
    }

    pub fn from_toml_str(document: &str) -> Result<Self> {
        let document: ReferenceDocument =
            toml::from_str(document).context("Failed to parse reference data")?;

        let mut indicators = Vec::with_capacity(document.indicators.len());
        for row in document.indicators {
            match row.category.parse::<IndicatorCategory>() {
                Ok(category) => indicators.push(EmissionIndicator::new(
                    row.name.trim(),
                    category,
                    row.emission_factor,
                )),
                Err(e) => tracing::warn!("Dropping indicator {}: {}", row.name, e),
            }
        }

        Ok(Self::new(document.breakpoints, indicators))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read reference data from {}", path.display()))?;
        let repository = Self::from_toml_str(&document)?;

        tracing::info!(
            "Loaded {} breakpoints and {} indicators from {}",
            repository.breakpoints.len(),
            repository.indicators.len(),
            path.display()
        );
        Ok(repository)
    }
}

#[async_trait]
impl ReferenceRepository for StaticReferenceRepository {
    async fn breakpoints(&self) -> Result<Vec<PollutantBreakpoint>> {
        Ok(self.breakpoints.clone())
    }

    async fn indicators(&self, category: IndicatorCategory) -> Result<Vec<EmissionIndicator>> {
        Ok(self
            .indicators
            .iter()
            .filter(|i| i.category == category)
            .cloned()
            .collect())
    }
}
