use crate::infra::{AppState, ProjectionDefaults};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Extension;
use axum::Json;
use predaiot_ede::error::AppError;
use predaiot_ede::workflows::decision::{DecisionInput, DecisionResult};
use predaiot_ede::workflows::impact::ImpactSummary;
use predaiot_ede::workflows::pipeline::ImpactPipeline;
use predaiot_ede::workflows::portfolio::{BoostPolicyKind, PlantRecord, PortfolioProjection};
use predaiot_ede::workflows::yield_report::{ImportIssue, YieldReport};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectionRequest {
    #[serde(default)]
    pub(crate) yield_report_csv: Option<String>,
    #[serde(default)]
    pub(crate) plants: Option<Vec<PlantRecord>>,
    #[serde(default)]
    pub(crate) policy: Option<BoostPolicyKind>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProjectionResponse {
    pub(crate) data_source: PlantDataSource,
    pub(crate) projection: PortfolioProjection,
    pub(crate) summary: ImpactSummary,
    pub(crate) highlights: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) issues: Vec<ImportIssue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum PlantDataSource {
    YieldReport,
    Plants,
}

pub(crate) fn with_decision_routes(defaults: ProjectionDefaults) -> axum::Router {
    axum::Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/decision", post(decision_endpoint))
        .route(
            "/api/v1/portfolio/projection",
            post(portfolio_projection_endpoint),
        )
        .layer(Extension(defaults))
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

pub(crate) async fn decision_endpoint(
    Json(payload): Json<DecisionInput>,
) -> Result<Json<DecisionResult>, AppError> {
    Ok(Json(payload.decide()?))
}

pub(crate) async fn portfolio_projection_endpoint(
    Extension(defaults): Extension<ProjectionDefaults>,
    Json(payload): Json<ProjectionRequest>,
) -> Result<Json<ProjectionResponse>, AppError> {
    let ProjectionRequest {
        yield_report_csv,
        plants,
        policy,
    } = payload;

    let pipeline = ImpactPipeline::from_config(&defaults.with_policy(policy));

    let (run, data_source) = match (yield_report_csv, plants) {
        (Some(csv), None) => (
            pipeline.run(Cursor::new(csv.into_bytes()))?,
            PlantDataSource::YieldReport,
        ),
        (None, Some(plants)) => {
            if let Some(position) = plants.iter().position(|plant| plant.name.trim().is_empty()) {
                return Err(AppError::InvalidRequest(format!(
                    "plants[{position}] has a blank name"
                )));
            }
            let import = YieldReport {
                plants,
                ..YieldReport::default()
            };
            (pipeline.project(import), PlantDataSource::Plants)
        }
        (Some(_), Some(_)) => {
            return Err(AppError::InvalidRequest(
                "send either yield_report_csv or plants, not both".to_string(),
            ))
        }
        (None, None) => {
            return Err(AppError::InvalidRequest(
                "yield_report_csv or plants is required".to_string(),
            ))
        }
    };

    let highlights = run.summary.highlights();
    Ok(Json(ProjectionResponse {
        data_source,
        projection: run.projection,
        summary: run.summary,
        highlights,
        issues: run.import.issues,
    }))
}
