use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use xray_domain::RunTrace;
use xray_service::{
	DeleteRunResponse, Error as ServiceError, IngestResponse, RunDetail, RunListRequest,
	RunListResponse, StepListRequest, StepListResponse, StepPerformanceRequest,
	StepPerformanceResponse,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	let max_payload_bytes = state.service.cfg.collector.max_payload_bytes;

	Router::new()
		.route("/health", get(health))
		.route("/api/runs", post(create_run).get(list_runs))
		.route("/api/runs/{run_id}", get(get_run).delete(delete_run))
		.route("/api/steps", get(list_steps))
		.route("/api/analytics/step-performance", get(step_performance))
		// Oversize documents are rejected outright, never truncated.
		.layer(DefaultBodyLimit::max(max_payload_bytes))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn create_run(
	State(state): State<AppState>,
	Json(payload): Json<RunTrace>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
	let response = state.service.ingest_run(payload).await?;
	Ok((StatusCode::CREATED, Json(response)))
}

async fn list_runs(
	State(state): State<AppState>,
	Query(params): Query<RunListRequest>,
) -> Result<Json<RunListResponse>, ApiError> {
	let response = state.service.list_runs(params).await?;
	Ok(Json(response))
}

async fn get_run(
	State(state): State<AppState>,
	Path(run_id): Path<String>,
) -> Result<Json<RunDetail>, ApiError> {
	let response = state.service.get_run(&run_id).await?;
	Ok(Json(response))
}

async fn delete_run(
	State(state): State<AppState>,
	Path(run_id): Path<String>,
) -> Result<Json<DeleteRunResponse>, ApiError> {
	let response = state.service.delete_run(&run_id).await?;
	Ok(Json(response))
}

async fn list_steps(
	State(state): State<AppState>,
	Query(params): Query<StepListRequest>,
) -> Result<Json<StepListResponse>, ApiError> {
	let response = state.service.list_steps(params).await?;
	Ok(Json(response))
}

async fn step_performance(
	State(state): State<AppState>,
	Query(params): Query<StepPerformanceRequest>,
) -> Result<Json<StepPerformanceResponse>, ApiError> {
	let response = state.service.step_performance(params).await?;
	Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } => ApiError::new(
				StatusCode::UNPROCESSABLE_ENTITY,
				"invalid_request",
				message,
				None,
			),
			ServiceError::InvalidQuery { message } =>
				ApiError::new(StatusCode::BAD_REQUEST, "invalid_query", message, None),
			ServiceError::NotFound { message } =>
				ApiError::new(StatusCode::NOT_FOUND, "not_found", message, None),
			ServiceError::Storage { message } => {
				tracing::error!(error = %message, "Storage failure while serving a request.");

				ApiError::new(
					StatusCode::INTERNAL_SERVER_ERROR,
					"storage_error",
					"Storage failure.",
					None,
				)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody {
			error_code: self.error_code,
			message: self.message,
			fields: self.fields,
		};
		(self.status, Json(body)).into_response()
	}
}
