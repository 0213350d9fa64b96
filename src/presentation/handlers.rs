// HTTP request handlers
use crate::application::dashboard_service::ReadingEvaluation;
use crate::application::footprint_service::{
    FootprintHistory, FootprintReport, FootprintRequest, HistoryFilter, IndicatorView,
};
use crate::application::sensor_history_service::{SensorHistory, SensorHistoryFilter};
use crate::domain::air_quality::SensorReading;
use crate::domain::dashboard::DashboardSnapshot;
use crate::domain::error::ReferenceDataError;
use crate::domain::footprint::{FootprintRecord, IndicatorCategory};
use crate::domain::session::UserContext;
use crate::presentation::app_state::AppState;
use crate::presentation::error::ApiError;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

#[derive(Debug, Serialize)]
pub struct SavedFootprint {
    pub record: FootprintRecord,
    pub report: FootprintReport,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/dashboard", get(dashboard))
        .route("/readings/latest", put(replace_reading))
        .route("/readings/history", get(reading_history))
        .route("/aqi", post(evaluate_reading))
        .route("/indicators/:category", get(list_indicators))
        .route("/footprints/calculate", post(calculate_footprint))
        .route("/footprints", post(save_footprint).get(footprint_history))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardSnapshot>, ApiError> {
    Ok(Json(state.dashboard_service.snapshot().await?))
}

/// Accept a reading pushed by the device bridge. Only available when the
/// service holds readings in process.
pub async fn replace_reading(
    State(state): State<Arc<AppState>>,
    Json(reading): Json<SensorReading>,
) -> Result<StatusCode, ApiError> {
    let Some(slot) = &state.reading_slot else {
        return Err(ApiError::NotFound(
            "readings are sourced from the device database".to_string(),
        ));
    };

    tracing::debug!("Replacing latest reading (heartbeat {})", reading.timestamp);
    slot.replace(reading).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reading_history(
    Query(filter): Query<SensorHistoryFilter>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<SensorHistory>, ApiError> {
    Ok(Json(state.sensor_history_service.history(&filter).await?))
}

pub async fn evaluate_reading(
    State(state): State<Arc<AppState>>,
    Json(reading): Json<SensorReading>,
) -> Result<Json<ReadingEvaluation>, ApiError> {
    Ok(Json(state.dashboard_service.evaluate(&reading).await?))
}

pub async fn list_indicators(
    Path(category): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<IndicatorView>>, ApiError> {
    let category: IndicatorCategory = category
        .parse()
        .map_err(|e: ReferenceDataError| ApiError::NotFound(e.to_string()))?;

    Ok(Json(state.footprint_service.indicators(category).await?))
}

fn ensure_ordered(request: &FootprintRequest) -> Result<(), ApiError> {
    if request.period.is_ordered() {
        Ok(())
    } else {
        Err(ApiError::BadRequest(
            "fromDate must not be after toDate".to_string(),
        ))
    }
}

pub async fn calculate_footprint(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FootprintRequest>,
) -> Result<Json<FootprintReport>, ApiError> {
    ensure_ordered(&request)?;
    Ok(Json(state.footprint_service.calculate(&request).await?))
}

pub async fn save_footprint(
    user: UserContext,
    State(state): State<Arc<AppState>>,
    Json(request): Json<FootprintRequest>,
) -> Result<(StatusCode, Json<SavedFootprint>), ApiError> {
    ensure_ordered(&request)?;
    let (record, report) = state.footprint_service.save(&user, &request).await?;
    Ok((StatusCode::CREATED, Json(SavedFootprint { record, report })))
}

pub async fn footprint_history(
    user: UserContext,
    Query(filter): Query<HistoryFilter>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<FootprintHistory>, ApiError> {
    Ok(Json(state.footprint_service.history(&user, &filter).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::aqi_engine::DEFAULT_STALENESS_TOLERANCE_SECS;
    use crate::application::dashboard_service::DashboardService;
    use crate::application::footprint_service::FootprintService;
    use crate::application::sensor_history_service::SensorHistoryService;
    use crate::domain::air_quality::{Pollutant, PollutantBreakpoint};
    use crate::domain::footprint::EmissionIndicator;
    use crate::infrastructure::memory_store::{FixedReadingSource, MemoryFootprintStore};
    use crate::infrastructure::static_repository::StaticReferenceRepository;
    use axum::{body::Body, http::Request};
    use chrono::{Duration, Utc};
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    fn create_test_state(with_slot: bool) -> Arc<AppState> {
        let references = Arc::new(StaticReferenceRepository::new(
            vec![
                PollutantBreakpoint::new("CO2", 0.0, 1000.0, 0.0, 100.0),
                PollutantBreakpoint::new("CO2", 1000.0, 5000.0, 100.0, 500.0),
                PollutantBreakpoint::new("CO", 0.0, 50.0, 0.0, 500.0),
                PollutantBreakpoint::new("VOC", 0.0, 500.0, 0.0, 500.0),
            ],
            vec![
                EmissionIndicator::new("Electricity", IndicatorCategory::Energy, 0.5),
                EmissionIndicator::new("Car", IndicatorCategory::Transportation, 0.2),
                EmissionIndicator::new("Waste", IndicatorCategory::General, 1.0),
            ],
        ));
        let slot = Arc::new(FixedReadingSource::new(None));

        Arc::new(AppState {
            dashboard_service: DashboardService::new(
                references.clone(),
                slot.clone(),
                Duration::seconds(DEFAULT_STALENESS_TOLERANCE_SECS),
            ),
            footprint_service: FootprintService::new(
                references,
                Arc::new(MemoryFootprintStore::new()),
            ),
            sensor_history_service: SensorHistoryService::new(slot.clone()),
            reading_slot: with_slot.then_some(slot),
        })
    }

    async fn response_body(response: axum::response::Response) -> String {
        let body = response.into_body();
        let bytes = body.collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn reading_json(seconds_ago: i64) -> serde_json::Value {
        let at = Utc::now() - Duration::seconds(seconds_ago);
        json!({
            "timestamp": at,
            "last_data_push": at,
            "temperature": 22.4,
            "humidity": 55.6,
            "concentrations": { "CO2": 1500.0, "CO": 2.0, "VOC": 100.0 }
        })
    }

    fn wizard_json() -> serde_json::Value {
        json!({
            "fromDate": "2025-03-01",
            "toDate": "2025-03-30",
            "energy": [{ "indicator_name": "Electricity", "quantity": "2000" }],
            "transportation": [{ "mode": "Car", "distance": 500 }],
            "general": [{ "indicator_name": "Waste", "quantity": 400 }]
        })
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = router().with_state(create_test_state(true));

        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_body(response).await, "ok");
    }

    #[tokio::test]
    async fn test_dashboard_disconnected_without_reading() {
        let app = router().with_state(create_test_state(true));

        let response = app
            .oneshot(Request::builder().uri("/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value =
            serde_json::from_str(&response_body(response).await).unwrap();
        assert_eq!(json["connected"], false);
        assert!(json["aqi"].is_null());
    }

    #[tokio::test]
    async fn test_pushed_reading_shows_on_dashboard() {
        let app = router().with_state(create_test_state(true));

        let response = app
            .clone()
            .oneshot(json_request("PUT", "/readings/latest", reading_json(5)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(Request::builder().uri("/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&response_body(response).await).unwrap();

        assert_eq!(json["connected"], true);
        assert_eq!(json["aqi"]["value"], 150);
        assert_eq!(json["aqi"]["label"], "Fair");
        assert_eq!(json["temperature"], 22);
        assert_eq!(json["humidity"], 56);
        assert_eq!(json["unrated_pollutants"], json!([]));
    }

    #[tokio::test]
    async fn test_pushed_readings_appear_in_history() {
        let app = router().with_state(create_test_state(true));

        for seconds_ago in [120, 5] {
            let response = app
                .clone()
                .oneshot(json_request("PUT", "/readings/latest", reading_json(seconds_ago)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
        }

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/readings/history?gas=VOC&month=&min_value=50")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value =
            serde_json::from_str(&response_body(response).await).unwrap();

        let groups = json["groups"].as_array().unwrap();
        assert_eq!(groups.len(), 2);
        assert!(groups[0]["recorded_at"].as_str() > groups[1]["recorded_at"].as_str());
        assert_eq!(groups[0]["samples"], json!([{ "gas_name": "VOC", "value": 100.0, "unit": "ppb" }]));
        assert!(!json["available_months"].as_array().unwrap().is_empty());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/readings/history?gas=CO&min_value=5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&response_body(response).await).unwrap();
        assert!(json["groups"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_push_rejected_without_slot() {
        let app = router().with_state(create_test_state(false));

        let response = app
            .oneshot(json_request("PUT", "/readings/latest", reading_json(0)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_evaluate_stale_reading() {
        let app = router().with_state(create_test_state(true));

        let response = app
            .oneshot(json_request("POST", "/aqi", reading_json(3600)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value =
            serde_json::from_str(&response_body(response).await).unwrap();
        assert_eq!(json["aqi"]["value"], 150);
        assert_eq!(json["aqi"]["sub_indices"]["VOC"], 100.0);
    }

    #[tokio::test]
    async fn test_indicators_with_units() {
        let app = router().with_state(create_test_state(true));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/indicators/transportation")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value =
            serde_json::from_str(&response_body(response).await).unwrap();
        assert_eq!(json[0]["name"], "Car");
        assert_eq!(json[0]["unit"], "km");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/indicators/food")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_calculate_footprint() {
        let app = router().with_state(create_test_state(true));

        let response = app
            .oneshot(json_request("POST", "/footprints/calculate", wizard_json()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value =
            serde_json::from_str(&response_body(response).await).unwrap();
        // 1000 + 100 + 400 kg of annualised sums scaled to 30 days
        assert_eq!(json["total_kg"], "123.29");
        assert_eq!(json["total_tonnes"], "0.123");
        assert_eq!(json["result"]["period_days"], 30);
        assert_eq!(json["result"]["classification"], "Excellent");
        assert_eq!(json["benchmarks"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_inverted_period_is_rejected() {
        let app = router().with_state(create_test_state(true));
        let mut body = wizard_json();
        body["fromDate"] = json!("2025-04-01");

        let response = app
            .oneshot(json_request("POST", "/footprints/calculate", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: serde_json::Value =
            serde_json::from_str(&response_body(response).await).unwrap();
        assert!(json["error"].as_str().unwrap().contains("fromDate"));
    }

    #[tokio::test]
    async fn test_save_requires_user() {
        let app = router().with_state(create_test_state(true));

        let response = app
            .oneshot(json_request("POST", "/footprints", wizard_json()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_save_then_history() {
        let app = router().with_state(create_test_state(true));

        let mut request = json_request("POST", "/footprints", wizard_json());
        request
            .headers_mut()
            .insert("x-user-id", "user-1".parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let saved: serde_json::Value =
            serde_json::from_str(&response_body(response).await).unwrap();
        assert_eq!(saved["record"]["calculated_value"], "0.123");
        assert_eq!(saved["record"]["user_id"], "user-1");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/footprints?classification=excellent&month=")
                    .header("x-user-id", "user-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let history: serde_json::Value =
            serde_json::from_str(&response_body(response).await).unwrap();
        assert_eq!(history["entries"].as_array().unwrap().len(), 1);
        assert_eq!(history["entries"][0]["classification"], "Excellent");
        assert_eq!(history["available_months"].as_array().unwrap().len(), 1);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/footprints")
                    .header("x-user-id", "someone-else")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let history: serde_json::Value =
            serde_json::from_str(&response_body(response).await).unwrap();
        assert!(history["entries"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_sub_index_keys_serialize_as_codes() {
        let key = serde_json::to_value(Pollutant::Co2).unwrap();
        assert_eq!(key, "CO2");
    }
}
