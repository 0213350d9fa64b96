// Footprint service - Use cases behind the calculator wizard and history
use crate::application::footprint_engine::{
    benchmarks, category_sum, classify, compute, format_kg, format_tonnes, reporting_days,
};
use crate::application::footprint_store::FootprintStore;
use crate::application::query::optional_param;
use crate::application::reference_repository::ReferenceRepository;
use crate::domain::footprint::{
    Benchmark, CategorySums, FootprintClass, FootprintEntry, FootprintRecord, FootprintResult,
    IndicatorCategory, ReportingPeriod, TransportEntry,
};
use crate::domain::session::UserContext;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Everything the wizard collected across its steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FootprintRequest {
    #[serde(flatten)]
    pub period: ReportingPeriod,
    #[serde(default)]
    pub energy: Vec<FootprintEntry>,
    #[serde(default)]
    pub transportation: Vec<TransportEntry>,
    #[serde(default)]
    pub general: Vec<FootprintEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FootprintReport {
    pub result: FootprintResult,
    pub total_kg: String,
    pub total_tonnes: String,
    pub benchmarks: Vec<Benchmark>,
    pub tips: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorView {
    pub name: String,
    pub emission_factor: f64,
    pub unit: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HistoryFilter {
    /// Month label such as "March 2025"
    #[serde(default, deserialize_with = "optional_param")]
    pub month: Option<String>,
    /// Case-insensitive class label
    #[serde(default, deserialize_with = "optional_param")]
    pub classification: Option<FootprintClass>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: FootprintRecord,
    pub classification: FootprintClass,
    pub month: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FootprintHistory {
    pub entries: Vec<HistoryEntry>,
    /// Month labels across all of the user's records, newest first
    pub available_months: Vec<String>,
}

#[derive(Clone)]
pub struct FootprintService {
    references: Arc<dyn ReferenceRepository>,
    store: Arc<dyn FootprintStore>,
}

impl FootprintService {
    pub fn new(references: Arc<dyn ReferenceRepository>, store: Arc<dyn FootprintStore>) -> Self {
        Self { references, store }
    }

    pub async fn indicators(&self, category: IndicatorCategory) -> anyhow::Result<Vec<IndicatorView>> {
        let indicators = self.references.indicators(category).await?;
        Ok(indicators
            .into_iter()
            .map(|i| IndicatorView {
                unit: i.unit(),
                name: i.name,
                emission_factor: i.emission_factor,
            })
            .collect())
    }

    pub async fn calculate(&self, request: &FootprintRequest) -> anyhow::Result<FootprintReport> {
        let (energy, transportation, general) = futures::try_join!(
            self.references.indicators(IndicatorCategory::Energy),
            self.references.indicators(IndicatorCategory::Transportation),
            self.references.indicators(IndicatorCategory::General),
        )?;

        let trips: Vec<FootprintEntry> = request
            .transportation
            .iter()
            .filter_map(TransportEntry::as_entry)
            .collect();

        let sums = CategorySums {
            electricity: category_sum(&request.energy, &energy),
            transportation: category_sum(&trips, &transportation),
            general: category_sum(&request.general, &general),
        };

        let days = reporting_days(&request.period);
        let result = compute(sums, days);

        tracing::debug!(
            "Footprint over {} days: {:.3} t ({})",
            days,
            result.total_emissions_tonnes,
            result.classification
        );

        Ok(FootprintReport {
            total_kg: format_kg(result.total_emissions_kg),
            total_tonnes: format_tonnes(result.total_emissions_tonnes),
            benchmarks: benchmarks(days),
            tips: result.classification.tips().to_vec(),
            result,
        })
    }

    pub async fn save(
        &self,
        user: &UserContext,
        request: &FootprintRequest,
    ) -> anyhow::Result<(FootprintRecord, FootprintReport)> {
        let report = self.calculate(request).await?;

        let record = FootprintRecord {
            id: String::new(),
            user_id: user.user_id.clone(),
            period: request.period,
            electricity_emission: report.result.electricity_emission,
            transportation_emission: report.result.transportation_emission,
            general_emission: report.result.general_emission,
            calculated_value: report.total_tonnes.clone(),
            created_at: Utc::now(),
        };

        let saved = self.store.save(record).await?;
        tracing::info!("Saved footprint {} for user {}", saved.id, user.user_id);
        Ok((saved, report))
    }

    pub async fn history(
        &self,
        user: &UserContext,
        filter: &HistoryFilter,
    ) -> anyhow::Result<FootprintHistory> {
        let mut records = self.store.list_for_user(&user.user_id).await?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let entries: Vec<HistoryEntry> = records.into_iter().map(history_entry).collect();

        let mut seen = HashSet::new();
        let available_months = entries
            .iter()
            .filter(|e| seen.insert(e.month.clone()))
            .map(|e| e.month.clone())
            .collect();

        let entries = entries
            .into_iter()
            .filter(|e| filter.month.as_ref().is_none_or(|m| e.month == *m))
            .filter(|e| filter.classification.is_none_or(|c| e.classification == c))
            .collect();

        Ok(FootprintHistory {
            entries,
            available_months,
        })
    }
}

fn history_entry(record: FootprintRecord) -> HistoryEntry {
    let tonnes = record.calculated_value.trim().parse::<f64>().unwrap_or(0.0);
    HistoryEntry {
        classification: classify(tonnes, reporting_days(&record.period)),
        month: record.created_at.format("%B %Y").to_string(),
        record,
    }
}
