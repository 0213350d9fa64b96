// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::application::footprint_service::FootprintService;
use crate::application::sensor_history_service::SensorHistoryService;
use crate::infrastructure::memory_store::FixedReadingSource;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub dashboard_service: DashboardService,
    pub footprint_service: FootprintService,
    pub sensor_history_service: SensorHistoryService,
    /// Present only when readings are pushed to this process instead of
    /// being pulled from the device database.
    pub reading_slot: Option<Arc<FixedReadingSource>>,
}
