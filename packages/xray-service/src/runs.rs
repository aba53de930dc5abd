use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};

use xray_storage::{models::PipelineRun, queries};

use crate::{Error, Result, XrayService, steps::StepTraceItem};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RunListRequest {
	pub pipeline_name: Option<String>,
	pub pipeline_version: Option<String>,
	pub success: Option<bool>,
	/// Comma-separated tags; a run must carry every one of them.
	pub tags: Option<String>,
	/// JSON object; a run matches iff its stored context contains this subset.
	pub context: Option<String>,
	pub limit: Option<u32>,
	pub offset: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
	pub run_id: String,
	pub pipeline_name: String,
	pub pipeline_version: String,
	pub success: bool,
	pub error: Option<String>,
	pub total_duration_ms: Option<f64>,
	#[serde(with = "xray_domain::time_serde")]
	pub started_at: time::OffsetDateTime,
	#[serde(with = "xray_domain::time_serde::option")]
	pub completed_at: Option<time::OffsetDateTime>,
	pub step_count: i64,
	pub context: Value,
	pub tags: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunListResponse {
	pub total: i64,
	pub items: Vec<RunSummary>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunDetail {
	pub run_id: String,
	pub pipeline_name: String,
	pub pipeline_version: String,
	pub success: bool,
	pub error: Option<String>,
	#[serde(with = "xray_domain::time_serde")]
	pub started_at: time::OffsetDateTime,
	#[serde(with = "xray_domain::time_serde::option")]
	pub completed_at: Option<time::OffsetDateTime>,
	pub total_duration_ms: Option<f64>,
	pub context: Value,
	pub tags: Value,
	pub final_output: Option<Value>,
	#[serde(with = "xray_domain::time_serde")]
	pub created_at: time::OffsetDateTime,
	pub steps: Vec<StepTraceItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteRunResponse {
	pub run_id: String,
	pub deleted: bool,
}

impl XrayService {
	/// Lists run summaries, newest first. `context` is containment matching:
	/// the stored context map must be a superset of the supplied pairs, with
	/// exact value equality per key.
	pub async fn list_runs(&self, req: RunListRequest) -> Result<RunListResponse> {
		let context = parse_context(req.context.as_deref())?;
		let tags = parse_tags(req.tags.as_deref());
		let limit = self.page_limit(req.limit);
		let offset = req.offset.unwrap_or(0) as i64;

		let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM pipeline_runs");

		push_run_filters(&mut count_builder, &req, context.as_ref(), tags.as_ref());

		let total: i64 = count_builder.build_query_scalar().fetch_one(&self.db.pool).await?;

		let mut builder = QueryBuilder::new(
			"SELECT run_id, pipeline_name, pipeline_version, success, error, started_at, \
			 completed_at, total_duration_ms, context, tags, final_output, created_at \
			 FROM pipeline_runs",
		);

		push_run_filters(&mut builder, &req, context.as_ref(), tags.as_ref());
		builder.push(" ORDER BY created_at DESC LIMIT ");
		builder.push_bind(limit);
		builder.push(" OFFSET ");
		builder.push_bind(offset);

		let runs: Vec<PipelineRun> = builder.build_query_as().fetch_all(&self.db.pool).await?;
		let mut items = Vec::with_capacity(runs.len());

		for run in runs {
			let step_count = queries::count_run_steps(&self.db, &run.run_id).await?;

			items.push(RunSummary {
				run_id: run.run_id,
				pipeline_name: run.pipeline_name,
				pipeline_version: run.pipeline_version,
				success: run.success,
				error: run.error,
				total_duration_ms: run.total_duration_ms,
				started_at: run.started_at,
				completed_at: run.completed_at,
				step_count,
				context: run.context,
				tags: run.tags,
			});
		}

		Ok(RunListResponse { total, items })
	}

	/// Full trace for one run, steps in close order.
	pub async fn get_run(&self, run_id: &str) -> Result<RunDetail> {
		let run = queries::fetch_run(&self.db, run_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: format!("Run {run_id} not found.") })?;
		let steps = queries::fetch_run_steps(&self.db, run_id).await?;

		Ok(RunDetail {
			run_id: run.run_id,
			pipeline_name: run.pipeline_name,
			pipeline_version: run.pipeline_version,
			success: run.success,
			error: run.error,
			started_at: run.started_at,
			completed_at: run.completed_at,
			total_duration_ms: run.total_duration_ms,
			context: run.context,
			tags: run.tags,
			final_output: run.final_output,
			created_at: run.created_at,
			steps: steps.into_iter().map(StepTraceItem::from).collect(),
		})
	}

	pub async fn delete_run(&self, run_id: &str) -> Result<DeleteRunResponse> {
		let deleted = queries::delete_run(&self.db, run_id).await?;

		if !deleted {
			return Err(Error::NotFound { message: format!("Run {run_id} not found.") });
		}

		tracing::info!(run_id, "Deleted pipeline run.");

		Ok(DeleteRunResponse { run_id: run_id.to_string(), deleted })
	}
}

fn push_run_filters(
	builder: &mut QueryBuilder<'_, Postgres>,
	req: &RunListRequest,
	context: Option<&Value>,
	tags: Option<&Value>,
) {
	builder.push(" WHERE TRUE");

	if let Some(pipeline_name) = req.pipeline_name.as_deref() {
		builder.push(" AND pipeline_name = ");
		builder.push_bind(pipeline_name.to_string());
	}
	if let Some(pipeline_version) = req.pipeline_version.as_deref() {
		builder.push(" AND pipeline_version = ");
		builder.push_bind(pipeline_version.to_string());
	}
	if let Some(success) = req.success {
		builder.push(" AND success = ");
		builder.push_bind(success);
	}
	if let Some(tags) = tags {
		builder.push(" AND tags @> ");
		builder.push_bind(tags.clone());
	}
	if let Some(context) = context {
		builder.push(" AND context @> ");
		builder.push_bind(context.clone());
	}
}

fn parse_context(raw: Option<&str>) -> Result<Option<Value>> {
	let Some(raw) = raw else {
		return Ok(None);
	};
	let trimmed = raw.trim();

	if trimmed.is_empty() {
		return Ok(None);
	}

	let value: Value = serde_json::from_str(trimmed).map_err(|err| Error::InvalidQuery {
		message: format!("context must be a JSON object: {err}."),
	})?;

	if !value.is_object() {
		return Err(Error::InvalidQuery {
			message: "context must be a JSON object.".to_string(),
		});
	}

	Ok(Some(value))
}

fn parse_tags(raw: Option<&str>) -> Option<Value> {
	let tags: Vec<Value> = raw?
		.split(',')
		.map(str::trim)
		.filter(|tag| !tag.is_empty())
		.map(|tag| Value::String(tag.to_string()))
		.collect();

	if tags.is_empty() { None } else { Some(Value::Array(tags)) }
}
