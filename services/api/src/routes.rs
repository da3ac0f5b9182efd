use crate::infra::{AppState, TrackerSnapshot};
use crate::report::{report_clock, snapshot_report, TrackerReport, LOCAL_USER};
use applyflow::config::TrackerConfig;
use applyflow::error::AppError;
use applyflow::tracker::{
    tracker_router, DateRange, ResumeStorage, TrackerRepository, TrackerService, UserId,
};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct ReportRequest {
    #[serde(flatten)]
    pub(crate) snapshot: TrackerSnapshot,
    #[serde(default)]
    pub(crate) start: Option<NaiveDate>,
    #[serde(default)]
    pub(crate) end: Option<NaiveDate>,
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn with_tracker_routes<R, S>(service: Arc<TrackerService<R, S>>) -> axum::Router
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    tracker_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/report", axum::routing::post(report_endpoint))
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

pub(crate) async fn report_endpoint(
    Json(payload): Json<ReportRequest>,
) -> Result<Json<TrackerReport>, AppError> {
    let ReportRequest {
        snapshot,
        start,
        end,
        today,
    } = payload;

    let range = DateRange { start, end };
    let report = snapshot_report(
        &UserId::from(LOCAL_USER),
        snapshot,
        range,
        report_clock(today),
        TrackerConfig::default(),
    )?;
    Ok(Json(report))
}
