use crate::infra::{deserialize_optional_date, resolve_threshold, AppState, MachineOverrides};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::NaiveDate;
use line_insight::analysis::machine::{MachineDataset, MachineReport};
use line_insight::analysis::rework::{
    ReworkDataset, ReworkOptions, ReworkReport, ReworkSchema, DEFAULT_DATE_COLUMN,
    DEFAULT_DEFECT_COLUMN,
};
use line_insight::analysis::DateRange;
use line_insight::config::AnalysisDefaults;
use line_insight::error::AppError;
use line_insight::export::{self, CsvExport};
use line_insight::labels::{LabelCanonicalizer, MappingEntry, SimilarityMetric};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;
use tracing::info;

#[derive(Debug, Deserialize)]
pub(crate) struct CanonicalizeRequest {
    pub(crate) labels: Vec<String>,
    #[serde(default)]
    pub(crate) threshold: Option<f64>,
    #[serde(default)]
    pub(crate) metric: Option<SimilarityMetric>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CanonicalizeResponse {
    pub(crate) threshold: f64,
    pub(crate) metric: SimilarityMetric,
    pub(crate) clusters: usize,
    pub(crate) mapping: Vec<MappingEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MachineReportRequest {
    pub(crate) csv: String,
    #[serde(flatten)]
    pub(crate) overrides: MachineOverrides,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReworkReportRequest {
    pub(crate) csv: String,
    #[serde(default)]
    pub(crate) threshold: Option<f64>,
    #[serde(default)]
    pub(crate) metric: Option<SimilarityMetric>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) end_date: Option<NaiveDate>,
    #[serde(default)]
    pub(crate) defect_column: Option<String>,
    #[serde(default)]
    pub(crate) date_column: Option<String>,
    #[serde(default)]
    pub(crate) normalize_labels: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ReworkTable {
    Pareto,
    #[default]
    Subset,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReworkExportQuery {
    #[serde(default)]
    pub(crate) table: ReworkTable,
}

/// Analysis endpoints; state carries the configured fallbacks.
pub(crate) fn analysis_router(defaults: AnalysisDefaults) -> Router {
    Router::new()
        .route("/api/v1/labels/canonicalize", post(canonicalize_endpoint))
        .route("/api/v1/machine/report", post(machine_report_endpoint))
        .route("/api/v1/machine/export", post(machine_export_endpoint))
        .route("/api/v1/rework/report", post(rework_report_endpoint))
        .route("/api/v1/rework/export", post(rework_export_endpoint))
        .with_state(defaults)
}

pub(crate) fn with_analysis_routes(defaults: AnalysisDefaults) -> Router {
    analysis_router(defaults)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
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

pub(crate) async fn canonicalize_endpoint(
    State(defaults): State<AnalysisDefaults>,
    Json(payload): Json<CanonicalizeRequest>,
) -> Result<Json<CanonicalizeResponse>, AppError> {
    let threshold = resolve_threshold(payload.threshold, defaults.similarity_threshold)?;
    let metric = payload.metric.unwrap_or(defaults.similarity_metric);

    let canonicalizer = LabelCanonicalizer::from_threshold(threshold).with_metric(metric);
    let mapping = canonicalizer.canonicalize(&payload.labels);
    info!(
        labels = mapping.len(),
        clusters = mapping.cluster_count(),
        "canonicalized labels"
    );

    Ok(Json(CanonicalizeResponse {
        threshold: canonicalizer.threshold(),
        metric: canonicalizer.metric(),
        clusters: mapping.cluster_count(),
        mapping: mapping.entries(),
    }))
}

pub(crate) async fn machine_report_endpoint(
    State(defaults): State<AnalysisDefaults>,
    Json(payload): Json<MachineReportRequest>,
) -> Result<Json<MachineReport>, AppError> {
    Ok(Json(build_machine_report(&defaults, payload)?))
}

pub(crate) async fn machine_export_endpoint(
    State(defaults): State<AnalysisDefaults>,
    Json(payload): Json<MachineReportRequest>,
) -> Result<Response, AppError> {
    let report = build_machine_report(&defaults, payload)?;
    let export = export::hourly_performance_csv(&report)?;
    Ok(download(export))
}

pub(crate) async fn rework_report_endpoint(
    State(defaults): State<AnalysisDefaults>,
    Json(payload): Json<ReworkReportRequest>,
) -> Result<Json<ReworkReport>, AppError> {
    let (dataset, options) = load_rework(&defaults, payload)?;
    Ok(Json(dataset.report(&options)?))
}

pub(crate) async fn rework_export_endpoint(
    State(defaults): State<AnalysisDefaults>,
    Query(query): Query<ReworkExportQuery>,
    Json(payload): Json<ReworkReportRequest>,
) -> Result<Response, AppError> {
    let (dataset, options) = load_rework(&defaults, payload)?;
    let export = match query.table {
        ReworkTable::Pareto => export::defect_pareto_csv(&dataset.report(&options)?)?,
        ReworkTable::Subset => export::rework_subset_csv(&dataset.filtered_rows(&options)?)?,
    };
    Ok(download(export))
}

fn build_machine_report(
    defaults: &AnalysisDefaults,
    payload: MachineReportRequest,
) -> Result<MachineReport, AppError> {
    let MachineReportRequest {
        csv,
        overrides,
        start_date,
        end_date,
    } = payload;

    let params = overrides.apply(defaults.machine);
    let dataset = MachineDataset::from_reader(Cursor::new(csv.into_bytes()))?;
    let range = DateRange::resolve(start_date, end_date, dataset.date_bounds())?;
    let report = dataset.report(&params, range)?;
    info!(
        parts = report.total_parts,
        hours = report.hourly.len(),
        "built machine report"
    );
    Ok(report)
}

fn load_rework(
    defaults: &AnalysisDefaults,
    payload: ReworkReportRequest,
) -> Result<(ReworkDataset, ReworkOptions), AppError> {
    let ReworkReportRequest {
        csv,
        threshold,
        metric,
        start_date,
        end_date,
        defect_column,
        date_column,
        normalize_labels,
    } = payload;

    let schema = ReworkSchema {
        defect_column: defect_column.unwrap_or_else(|| DEFAULT_DEFECT_COLUMN.to_string()),
        date_column: Some(date_column.unwrap_or_else(|| DEFAULT_DATE_COLUMN.to_string())),
    };
    let dataset = ReworkDataset::from_reader(Cursor::new(csv.into_bytes()), &schema)?;

    let options = ReworkOptions {
        threshold: resolve_threshold(threshold, defaults.similarity_threshold)?,
        metric: metric.unwrap_or(defaults.similarity_metric),
        range: DateRange::resolve(start_date, end_date, dataset.date_bounds())?,
        normalize_labels: normalize_labels.unwrap_or(true),
    };
    Ok((dataset, options))
}

fn download(export: CsvExport) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, export.content_type.to_string()),
            (header::CONTENT_DISPOSITION, export.content_disposition()),
        ],
        export.bytes,
    )
        .into_response()
}
