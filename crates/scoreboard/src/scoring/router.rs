use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::cycle::{cycle_windows, resolve_window, CycleLabel, ReportingMonth};
use super::service::DashboardService;
use super::sources::{DirectorySource, FactsSource, TargetConfigSource};
use crate::error::AppError;

/// Query string shared by the dashboard and leaderboard endpoints.
#[derive(Debug, Deserialize)]
pub struct CycleQuery {
    pub month: String,
    #[serde(default)]
    pub cycle: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl CycleQuery {
    fn cycle_label(&self) -> &str {
        self.cycle.as_deref().unwrap_or(CycleLabel::All.label())
    }
}

/// Router builder exposing the dashboard, leaderboard and cycle window endpoints.
pub fn dashboard_router<D, F, T>(service: Arc<DashboardService<D, F, T>>) -> Router
where
    D: DirectorySource + 'static,
    F: FactsSource + 'static,
    T: TargetConfigSource + 'static,
{
    Router::new()
        .route(
            "/api/v1/dashboard/:member_id",
            get(dashboard_handler::<D, F, T>),
        )
        .route("/api/v1/leaderboard", get(leaderboard_handler::<D, F, T>))
        .route("/api/v1/windows/:month", get(windows_handler))
        .with_state(service)
}

pub(crate) async fn dashboard_handler<D, F, T>(
    State(service): State<Arc<DashboardService<D, F, T>>>,
    Path(member_id): Path<String>,
    Query(query): Query<CycleQuery>,
) -> Response
where
    D: DirectorySource + 'static,
    F: FactsSource + 'static,
    T: TargetConfigSource + 'static,
{
    match service
        .snapshot(&member_id, &query.month, query.cycle_label())
        .await
    {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn leaderboard_handler<D, F, T>(
    State(service): State<Arc<DashboardService<D, F, T>>>,
    Query(query): Query<CycleQuery>,
) -> Response
where
    D: DirectorySource + 'static,
    F: FactsSource + 'static,
    T: TargetConfigSource + 'static,
{
    match service.leaderboard(&query.month, query.cycle_label()).await {
        Ok(mut leaderboard) => {
            if let Some(limit) = query.limit {
                leaderboard.outcome.ranked.truncate(limit);
            }
            (StatusCode::OK, Json(leaderboard)).into_response()
        }
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn windows_handler(Path(month): Path<String>) -> Response {
    match ReportingMonth::parse(&month) {
        Ok(month) => {
            let payload = json!({
                "month": month,
                "all": resolve_window(month, CycleLabel::All),
                "cycles": cycle_windows(month),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => AppError::from(err).into_response(),
    }
}
