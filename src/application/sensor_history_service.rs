// Sensor history service - Archived gas readings grouped by push time
use crate::application::query::optional_param;
use crate::application::reference_repository::ReadingHistory;
use crate::domain::air_quality::GasSample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SensorHistoryFilter {
    /// Gas name such as "CO2"; "All" or blank keeps every gas
    #[serde(default, deserialize_with = "optional_param")]
    pub gas: Option<String>,
    /// Month label such as "March 2025"
    #[serde(default, deserialize_with = "optional_param")]
    pub month: Option<String>,
    #[serde(default, deserialize_with = "optional_param")]
    pub min_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleView {
    pub gas_name: String,
    pub value: f64,
    pub unit: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleGroup {
    pub recorded_at: DateTime<Utc>,
    pub month: String,
    pub samples: Vec<SampleView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorHistory {
    pub groups: Vec<SampleGroup>,
    /// Month labels across the whole log, newest first
    pub available_months: Vec<String>,
}

#[derive(Clone)]
pub struct SensorHistoryService {
    history: Arc<dyn ReadingHistory>,
}

impl SensorHistoryService {
    pub fn new(history: Arc<dyn ReadingHistory>) -> Self {
        Self { history }
    }

    /// Samples recorded at the same instant form one group. Groups come
    /// newest first and keep only the samples passing the gas and value
    /// filters; a group left empty is dropped.
    pub async fn history(&self, filter: &SensorHistoryFilter) -> anyhow::Result<SensorHistory> {
        let samples = self.history.gas_samples().await?;
        tracing::debug!("Loaded {} archived samples", samples.len());

        let mut grouped: BTreeMap<DateTime<Utc>, Vec<GasSample>> = BTreeMap::new();
        for sample in samples {
            grouped.entry(sample.recorded_at).or_default().push(sample);
        }

        let mut seen = HashSet::new();
        let available_months = grouped
            .keys()
            .rev()
            .map(month_label)
            .filter(|m| seen.insert(m.clone()))
            .collect();

        let threshold = filter.min_value.filter(|v| v.is_finite()).unwrap_or(0.0);

        let groups = grouped
            .into_iter()
            .rev()
            .filter(|(at, _)| {
                filter
                    .month
                    .as_deref()
                    .is_none_or(|m| month_label(at).eq_ignore_ascii_case(m))
            })
            .filter_map(|(at, samples)| {
                let samples: Vec<SampleView> = samples
                    .into_iter()
                    .filter(|s| filter.gas.as_deref().is_none_or(|g| s.is_gas(g)))
                    .filter(|s| s.value >= threshold)
                    .map(|s| SampleView {
                        unit: s.unit(),
                        gas_name: s.gas_name.trim().to_string(),
                        value: s.value,
                    })
                    .collect();

                (!samples.is_empty()).then(|| SampleGroup {
                    month: month_label(&at),
                    recorded_at: at,
                    samples,
                })
            })
            .collect();

        Ok(SensorHistory {
            groups,
            available_months,
        })
    }
}

fn month_label(at: &DateTime<Utc>) -> String {
    at.format("%B %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct Log(Vec<GasSample>);

    #[async_trait::async_trait]
    impl ReadingHistory for Log {
        async fn gas_samples(&self) -> anyhow::Result<Vec<GasSample>> {
            Ok(self.0.clone())
        }
    }

    fn at(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, month, day, 9, 30, 0).unwrap()
    }

    fn service() -> SensorHistoryService {
        SensorHistoryService::new(Arc::new(Log(vec![
            GasSample::new(at(4, 2), "CO2", 640.0),
            GasSample::new(at(5, 7), "CO2", 1210.0),
            GasSample::new(at(4, 2), "VOC", 35.0),
            GasSample::new(at(5, 7), "CO ", 3.5),
            GasSample::new(at(5, 7), "VOC", 410.0),
            GasSample::new(at(4, 20), "CO", 0.8),
        ])))
    }

    #[tokio::test]
    async fn test_groups_newest_first() {
        let history = service().history(&SensorHistoryFilter::default()).await.unwrap();

        assert_eq!(history.available_months, vec!["May 2025", "April 2025"]);
        let times: Vec<_> = history.groups.iter().map(|g| g.recorded_at).collect();
        assert_eq!(times, vec![at(5, 7), at(4, 20), at(4, 2)]);
        assert_eq!(history.groups[0].samples.len(), 3);
        assert_eq!(history.groups[0].samples[1].gas_name, "CO");
        assert_eq!(history.groups[0].samples[2].unit, "ppb");
    }

    #[tokio::test]
    async fn test_gas_and_value_filters_trim_groups() {
        let filter = SensorHistoryFilter {
            gas: Some("co2".to_string()),
            month: None,
            min_value: Some(1000.0),
        };
        let history = service().history(&filter).await.unwrap();

        assert_eq!(history.groups.len(), 1);
        assert_eq!(history.groups[0].recorded_at, at(5, 7));
        assert_eq!(
            history.groups[0].samples,
            vec![SampleView {
                gas_name: "CO2".to_string(),
                value: 1210.0,
                unit: "ppm",
            }]
        );
        assert_eq!(history.available_months.len(), 2);
    }

    #[tokio::test]
    async fn test_month_filter() {
        let filter = SensorHistoryFilter {
            month: Some("April 2025".to_string()),
            ..SensorHistoryFilter::default()
        };
        let history = service().history(&filter).await.unwrap();
        assert_eq!(history.groups.len(), 2);
        assert!(history.groups.iter().all(|g| g.month == "April 2025"));
    }

    #[test]
    fn test_filter_from_query_values() {
        let filter: SensorHistoryFilter = serde_json::from_value(serde_json::json!({
            "gas": "All",
            "month": "",
            "min_value": "2.5"
        }))
        .unwrap();
        assert_eq!(filter.gas, None);
        assert_eq!(filter.month, None);
        assert_eq!(filter.min_value, Some(2.5));
    }
}
