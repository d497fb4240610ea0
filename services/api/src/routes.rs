use crate::infra::{ledger_service, AppState};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use scoreboard::error::AppError;
use scoreboard::ledger::{FactsLedger, TargetSheet};
use scoreboard::scoring::{
    dashboard_router, DashboardService, DirectorySource, FactsSource, Leaderboard,
    RankingOptions, TargetConfigSource,
};
use serde::Deserialize;
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;

/// Inline CSV exports to rank without touching the configured ledgers.
#[derive(Debug, Deserialize)]
pub(crate) struct LedgerPreviewRequest {
    pub(crate) month: String,
    #[serde(default)]
    pub(crate) cycle: Option<String>,
    pub(crate) facts_csv: String,
    #[serde(default)]
    pub(crate) targets_csv: Option<String>,
    #[serde(default)]
    pub(crate) squads: Vec<(String, String)>,
}

pub(crate) fn with_dashboard_routes<D, F, T>(
    service: Arc<DashboardService<D, F, T>>,
) -> axum::Router
where
    D: DirectorySource + 'static,
    F: FactsSource + 'static,
    T: TargetConfigSource + 'static,
{
    dashboard_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/ledger/preview",
            axum::routing::post(ledger_preview_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn ledger_preview_endpoint(
    Json(payload): Json<LedgerPreviewRequest>,
) -> Result<Json<Leaderboard>, AppError> {
    let LedgerPreviewRequest {
        month,
        cycle,
        facts_csv,
        targets_csv,
        squads,
    } = payload;

    let facts = FactsLedger::from_reader(Cursor::new(facts_csv.into_bytes()))?.with_squads(squads);
    let targets = match targets_csv {
        Some(csv) => TargetSheet::from_reader(Cursor::new(csv.into_bytes()))?,
        None => TargetSheet::default(),
    };

    let service = ledger_service(facts, targets, RankingOptions::default());
    let leaderboard = service
        .leaderboard(&month, cycle.as_deref().unwrap_or("All"))
        .await?;

    Ok(Json(leaderboard))
}
