use crate::cli::ServeArgs;
use crate::infra::{ledger_service, load_ledgers, AppState};
use crate::routes::with_dashboard_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use scoreboard::config::AppConfig;
use scoreboard::error::AppError;
use scoreboard::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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

    let (facts, targets) = load_ledgers(
        config.scoring.facts_csv.as_deref(),
        config.scoring.targets_csv.as_deref(),
        &config.scoring.squads,
    )?;
    let dashboard_service = ledger_service(facts, targets, config.scoring.ranking_options());

    let app = with_dashboard_routes(dashboard_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        max_concurrency = config.scoring.max_concurrency,
        "scoreboard service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
