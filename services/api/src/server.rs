use crate::cli::ServeArgs;
use crate::infra::{portal_settings, AppState, InMemoryPortalStore};
use crate::routes::with_portal_routes;
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use schoolpay_verify::config::{AppConfig, PortalConfig};
use schoolpay_verify::error::AppError;
use schoolpay_verify::telemetry;
use schoolpay_verify::workflows::verification::{PortalService, SimulatedAnalyzer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

type Portal = PortalService<InMemoryPortalStore, SimulatedAnalyzer>;

/// Portal service over the in-memory store and the simulated analyzer.
fn build_portal(config: &PortalConfig) -> Arc<Portal> {
    Arc::new(PortalService::new(
        Arc::new(InMemoryPortalStore::default()),
        Arc::new(SimulatedAnalyzer),
        portal_settings(config),
    ))
}

fn portal_app(portal: Arc<Portal>, state: AppState) -> Router {
    with_portal_routes(portal).layer(Extension(state))
}

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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let portal = build_portal(&config.portal);
    let settings = portal.settings().clone();
    let app = portal_app(portal, app_state).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        code_ttl_hours = settings.payment_code_ttl_hours,
        max_receipt_bytes = settings.max_receipt_bytes,
        auto_verify_confidence = settings.triage.auto_verify_confidence,
        "receipt verification portal ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
