use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Local;
use tracing::info;

use crate::cli::ServeArgs;
use crate::demo;
use crate::infra::AppState;
use crate::routes::with_inspection_routes;
use fleetcheck::config::AppConfig;
use fleetcheck::error::AppError;
use fleetcheck::inspections::{
    InspectionApi, InspectionService, MemoryInspectionStore, SyncProcessor,
};
use fleetcheck::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(MemoryInspectionStore::default());
    let service = Arc::new(InspectionService::new(store.clone()));
    let sync = Arc::new(SyncProcessor::new(service.clone(), store.clone()));

    if args.seed_demo {
        let fleet = demo::seed_fleet(&store, &service, Local::now().date_naive())?;
        info!(
            vehicles = fleet.vehicles.len(),
            items = fleet.checklist.items.len(),
            "demo fleet seeded"
        );
    }

    let app = with_inspection_routes(InspectionApi { service, sync })
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "inspection service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
