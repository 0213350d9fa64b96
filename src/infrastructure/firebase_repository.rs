// Firebase adapters: realtime database readings and Firestore documents
use crate::application::footprint_store::FootprintStore;
use crate::application::reference_repository::{
    ReadingHistory, ReadingSource, ReferenceRepository,
};
use crate::domain::air_quality::{GasSample, Pollutant, PollutantBreakpoint, SensorReading};
use crate::domain::footprint::{
    EmissionIndicator, FootprintRecord, IndicatorCategory, ReportingPeriod,
};
use crate::infrastructure::config::FirebaseSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const BREAKPOINT_COLLECTION: &str = "AQI";
const INDICATOR_COLLECTION: &str = "Indecator";
const FOOTPRINT_COLLECTION: &str = "Carbon_footprint";
const SENSOR_LOG_COLLECTION: &str = "Air_quality";
const PAGE_SIZE: usize = 300;
const INDICATOR_TTL: Duration = Duration::from_secs(300);

/// Epoch values at or above this are milliseconds (year 5138 in seconds).
const EPOCH_MILLIS_FROM: f64 = 1.0e11;

/// Format of `Date_Time` in the sensor log, e.g. "12 May 2025 at 14:03:22".
const SENSOR_LOG_TIME_FORMAT: &str = "%d %B %Y at %H:%M:%S";

/// Snapshot of the device node in the realtime database. Times are seconds
/// or milliseconds since the epoch, depending on the firmware.
#[derive(Debug, Default, Deserialize)]
struct DeviceNode {
    temp: Option<f64>,
    humid: Option<f64>,
    #[serde(rename = "CO2_ppm")]
    co2_ppm: Option<f64>,
    #[serde(rename = "CO_ppm")]
    co_ppm: Option<f64>,
    #[serde(rename = "VOC")]
    voc: Option<f64>,
    timestamp: Option<f64>,
    last_data_push: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FirestoreValue {
    string_value: Option<String>,
    integer_value: Option<String>,
    double_value: Option<f64>,
    timestamp_value: Option<String>,
}

impl FirestoreValue {
    fn as_f64(&self) -> Option<f64> {
        self.double_value
            .or_else(|| self.integer_value.as_deref().and_then(|v| v.parse().ok()))
            .or_else(|| self.string_value.as_deref().and_then(|v| v.trim().parse().ok()))
    }

    fn as_str(&self) -> Option<&str> {
        self.string_value.as_deref()
    }

    fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp_value
            .as_deref()
            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            .map(|t| t.with_timezone(&Utc))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: HashMap<String, FirestoreValue>,
    create_time: Option<String>,
}

impl FirestoreDocument {
    /// Field names in the collections carry stray whitespace ("Category "),
    /// so fall back to a trimmed comparison.
    fn field(&self, name: &str) -> Option<&FirestoreValue> {
        self.fields.get(name).or_else(|| {
            self.fields
                .iter()
                .find(|(key, _)| key.trim() == name)
                .map(|(_, value)| value)
        })
    }

    fn number(&self, name: &str) -> Option<f64> {
        self.field(name).and_then(FirestoreValue::as_f64)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(FirestoreValue::as_str)
    }

    fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunQueryRow {
    document: Option<FirestoreDocument>,
}

/// Shares one fetch of the indicator table between concurrent callers and
/// reuses it until it expires.
#[derive(Debug)]
struct IndicatorCache {
    ttl: Duration,
    slot: Mutex<Option<(Instant, Vec<EmissionIndicator>)>>,
}

impl IndicatorCache {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<Vec<EmissionIndicator>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<EmissionIndicator>>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some((fetched_at, table)) = slot.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(table.clone());
            }
        }

        let table = fetch().await?;
        *slot = Some((Instant::now(), table.clone()));
        Ok(table)
    }
}

#[derive(Debug, Clone)]
pub struct FirebaseClient {
    http: reqwest::Client,
    database_url: String,
    reading_path: String,
    documents_url: String,
    api_key: Option<String>,
    database_secret: Option<String>,
    indicators: Arc<IndicatorCache>,
}

impl FirebaseClient {
    pub fn new(settings: &FirebaseSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            database_url: settings.database_url.trim_end_matches('/').to_string(),
            reading_path: settings.reading_path.trim_matches('/').to_string(),
            documents_url: format!(
                "{}/projects/{}/databases/(default)/documents",
                settings.firestore_url.trim_end_matches('/'),
                settings.project_id
            ),
            api_key: settings.api_key.clone(),
            database_secret: settings.database_secret.clone(),
            indicators: Arc::new(IndicatorCache::new(INDICATOR_TTL)),
        }
    }

    /// Firestore REST calls carry the web API key as `key`.
    fn with_key(&self, url: String, separator: char) -> String {
        with_param(url, separator, "key", self.api_key.as_deref())
    }

    /// Realtime database reads carry an ID token or database secret as `auth`.
    fn with_auth(&self, url: String) -> String {
        with_param(url, '?', "auth", self.database_secret.as_deref())
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to Firebase")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Firebase request failed with status {}: {}", status, body);
        }

        response
            .json::<T>()
            .await
            .context("Failed to parse Firebase response")
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request to Firestore")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Firestore request failed with status {}: {}", status, body);
        }

        response
            .json::<T>()
            .await
            .context("Failed to parse Firestore response")
    }

    async fn list_collection(&self, collection: &str) -> Result<Vec<FirestoreDocument>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!("{}/{}?pageSize={}", self.documents_url, collection, PAGE_SIZE);
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
            }
            let url = self.with_key(url, '&');

            let page: ListDocumentsResponse = self.get_json(&url).await?;
            documents.extend(page.documents);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!("Fetched {} documents from {}", documents.len(), collection);
        Ok(documents)
    }

    async fn indicator_table(&self) -> Result<Vec<EmissionIndicator>> {
        self.indicators
            .get_or_fetch(|| async {
                let documents = self.list_collection(INDICATOR_COLLECTION).await?;
                Ok(documents.iter().filter_map(indicator_from_document).collect())
            })
            .await
    }
}

fn with_param(url: String, separator: char, param: &str, value: Option<&str>) -> String {
    match value {
        Some(value) => format!("{}{}{}={}", url, separator, param, urlencoding::encode(value)),
        None => url,
    }
}

#[async_trait]
impl ReadingSource for FirebaseClient {
    async fn latest_reading(&self) -> Result<Option<SensorReading>> {
        let url = self.with_auth(format!("{}/{}.json", self.database_url, self.reading_path));
        let node: Option<DeviceNode> = self.get_json(&url).await?;
        Ok(node.and_then(reading_from_node))
    }
}

#[async_trait]
impl ReferenceRepository for FirebaseClient {
    async fn breakpoints(&self) -> Result<Vec<PollutantBreakpoint>> {
        let documents = self.list_collection(BREAKPOINT_COLLECTION).await?;
        Ok(documents.iter().filter_map(breakpoint_from_document).collect())
    }

    async fn indicators(&self, category: IndicatorCategory) -> Result<Vec<EmissionIndicator>> {
        let mut table = self.indicator_table().await?;
        table.retain(|i| i.category == category);
        Ok(table)
    }
}

#[async_trait]
impl ReadingHistory for FirebaseClient {
    async fn gas_samples(&self) -> Result<Vec<GasSample>> {
        let documents = self.list_collection(SENSOR_LOG_COLLECTION).await?;
        Ok(documents.iter().filter_map(sample_from_document).collect())
    }
}

#[async_trait]
impl FootprintStore for FirebaseClient {
    async fn save(&self, record: FootprintRecord) -> Result<FootprintRecord> {
        let url = self.with_key(format!("{}/{}", self.documents_url, FOOTPRINT_COLLECTION), '?');
        let document: FirestoreDocument = self.post_json(&url, &record_fields(&record)).await?;

        record_from_document(&document)
            .context("Firestore returned an unreadable footprint document")
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<FootprintRecord>> {
        let url = self.with_key(format!("{}:runQuery", self.documents_url), '?');
        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": FOOTPRINT_COLLECTION }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": "User_ID" },
                        "op": "EQUAL",
                        "value": { "stringValue": user_id }
                    }
                }
            }
        });

        let rows: Vec<RunQueryRow> = self.post_json(&url, &query).await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.document.as_ref())
            .filter_map(record_from_document)
            .collect())
    }
}

fn from_epoch(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    if value >= EPOCH_MILLIS_FROM {
        DateTime::from_timestamp_millis(value as i64)
    } else {
        DateTime::from_timestamp(value as i64, 0)
    }
}

fn reading_from_node(node: DeviceNode) -> Option<SensorReading> {
    let Some(timestamp) = node.timestamp.and_then(from_epoch) else {
        tracing::debug!("Device node has no heartbeat timestamp");
        return None;
    };

    let mut reading = SensorReading::new(timestamp);
    reading.last_data_push = node.last_data_push.and_then(from_epoch);
    reading.temperature = node.temp;
    reading.humidity = node.humid;

    for (pollutant, value) in [
        (Pollutant::Co2, node.co2_ppm),
        (Pollutant::Co, node.co_ppm),
        (Pollutant::Voc, node.voc),
    ] {
        if let Some(value) = value {
            reading.concentrations.insert(pollutant, value);
        }
    }

    Some(reading)
}

fn breakpoint_from_document(document: &FirestoreDocument) -> Option<PollutantBreakpoint> {
    let row = PollutantBreakpoint::new(
        document.text("Gas_Name")?.trim(),
        document.number("C_low")?,
        document.number("C_high")?,
        document.number("I_low")?,
        document.number("I_high")?,
    );

    match row.validate() {
        Ok(()) => Some(row),
        Err(e) => {
            tracing::warn!("Skipping breakpoint document {}: {}", document.id(), e);
            None
        }
    }
}

fn indicator_from_document(document: &FirestoreDocument) -> Option<EmissionIndicator> {
    let name = document.text("Indecator_Name")?.trim();
    let category = match document.text("Category")?.parse::<IndicatorCategory>() {
        Ok(category) => category,
        Err(e) => {
            tracing::warn!("Skipping indicator document {}: {}", document.id(), e);
            return None;
        }
    };
    let indicator = EmissionIndicator::new(
        name,
        category,
        document.number("Emission_factor_value").unwrap_or(0.0),
    );

    match indicator.validate() {
        Ok(()) => Some(indicator),
        Err(e) => {
            tracing::warn!("Skipping indicator document {}: {}", document.id(), e);
            None
        }
    }
}

fn sample_from_document(document: &FirestoreDocument) -> Option<GasSample> {
    let field = document.field("Date_Time")?;
    let recorded_at = field.as_timestamp().or_else(|| {
        field
            .as_str()
            .and_then(|v| NaiveDateTime::parse_from_str(v.trim(), SENSOR_LOG_TIME_FORMAT).ok())
            .map(|t| t.and_utc())
    });

    let Some(recorded_at) = recorded_at else {
        tracing::warn!("Skipping sensor log document {}: unreadable Date_Time", document.id());
        return None;
    };

    Some(GasSample::new(
        recorded_at,
        document.text("Gas_Name")?.trim(),
        document.number("Real_time_data")?,
    ))
}

fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok())
}

fn record_from_document(document: &FirestoreDocument) -> Option<FootprintRecord> {
    let created_at = document
        .field("Timestamp")
        .and_then(FirestoreValue::as_timestamp)
        .or_else(|| {
            document
                .create_time
                .as_deref()
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|t| t.with_timezone(&Utc))
        })?;

    Some(FootprintRecord {
        id: document.id().to_string(),
        user_id: document.text("User_ID")?.to_string(),
        period: ReportingPeriod {
            from_date: parse_date(document.text("fromDate")),
            to_date: parse_date(document.text("toDate")),
        },
        electricity_emission: document.number("electricityEmission").unwrap_or(0.0),
        transportation_emission: document.number("transportationEmission").unwrap_or(0.0),
        general_emission: document.number("generalEmission").unwrap_or(0.0),
        calculated_value: document.text("Calculated_value").unwrap_or("0").to_string(),
        created_at,
    })
}

fn record_fields(record: &FootprintRecord) -> serde_json::Value {
    let date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
    json!({
        "fields": {
            "Calculated_value": { "stringValue": record.calculated_value },
            "User_ID": { "stringValue": record.user_id },
            "fromDate": { "stringValue": date(record.period.from_date) },
            "toDate": { "stringValue": date(record.period.to_date) },
            "electricityEmission": { "doubleValue": record.electricity_emission },
            "transportationEmission": { "doubleValue": record.transportation_emission },
            "generalEmission": { "doubleValue": record.general_emission },
            "Timestamp": {
                "timestampValue": record.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)
            }
        }
    })
}
