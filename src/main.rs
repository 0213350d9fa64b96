// Main entry point - Dependency injection and server setup
use std::sync::Arc;

use anyhow::Context;
use chrono::Duration;
use tracing_subscriber::EnvFilter;

use naqa::application::dashboard_service::DashboardService;
use naqa::application::footprint_service::FootprintService;
use naqa::application::footprint_store::FootprintStore;
use naqa::application::reference_repository::{
    ReadingHistory, ReadingSource, ReferenceRepository,
};
use naqa::application::sensor_history_service::SensorHistoryService;
use naqa::infrastructure::config::{load_app_config, SourceKind};
use naqa::infrastructure::firebase_repository::FirebaseClient;
use naqa::infrastructure::memory_store::{FixedReadingSource, MemoryFootprintStore};
use naqa::infrastructure::static_repository::StaticReferenceRepository;
use naqa::presentation::app_state::AppState;
use naqa::presentation::handlers::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("naqa=info,tower_http=info")),
        )
        .init();

    let config = load_app_config()?;

    // Pick adapters (infrastructure layer)
    let references: Arc<dyn ReferenceRepository>;
    let readings: Arc<dyn ReadingSource>;
    let history: Arc<dyn ReadingHistory>;
    let store: Arc<dyn FootprintStore>;
    let mut reading_slot = None;

    match config.sources.kind {
        SourceKind::Static => {
            references = Arc::new(StaticReferenceRepository::load(&config.sources.static_path)?);
            let slot = Arc::new(FixedReadingSource::default());
            readings = slot.clone();
            history = slot.clone();
            reading_slot = Some(slot);
            store = Arc::new(MemoryFootprintStore::new());
        }
        SourceKind::Firebase => {
            let settings = config
                .firebase
                .as_ref()
                .context("sources.kind = \"firebase\" requires a [firebase] section")?;
            let client = Arc::new(FirebaseClient::new(settings));
            tracing::info!("Using Firebase project {}", settings.project_id);
            references = client.clone();
            readings = client.clone();
            history = client.clone();
            store = client;
        }
    }

    // Create services (application layer)
    let tolerance = Duration::seconds(config.sensor.staleness_tolerance_secs);
    let state = Arc::new(AppState {
        dashboard_service: DashboardService::new(references.clone(), readings, tolerance),
        footprint_service: FootprintService::new(references, store),
        sensor_history_service: SensorHistoryService::new(history),
        reading_slot,
    });

    // Build router (presentation layer)
    let app = router().with_state(state);

    let addr = config.server.bind_addr;
    tracing::info!("Starting naqa service on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
