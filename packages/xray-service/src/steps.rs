use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};

use xray_storage::models::StepTraceRow;

use crate::{Result, XrayService};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StepListRequest {
	pub step_name: Option<String>,
	pub step_type: Option<String>,
	/// Inclusive lower bound.
	pub min_reduction_rate: Option<f64>,
	/// Inclusive upper bound.
	pub max_reduction_rate: Option<f64>,
	pub min_duration_ms: Option<f64>,
	pub max_duration_ms: Option<f64>,
	pub pipeline_name: Option<String>,
	pub limit: Option<u32>,
	pub offset: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepTraceItem {
	pub run_id: String,
	pub step_name: String,
	pub step_type: String,
	pub duration_ms: Option<f64>,
	#[serde(rename = "timestamp", with = "xray_domain::time_serde")]
	pub recorded_at: time::OffsetDateTime,
	pub input_count: i64,
	pub output_count: i64,
	pub reduction_rate: f64,
	pub inputs: Value,
	pub outputs: Value,
	pub input_candidates: Value,
	pub output_candidates: Value,
	pub decisions: Value,
	pub metadata: Value,
	pub sample_rate: f64,
}
impl From<StepTraceRow> for StepTraceItem {
	fn from(row: StepTraceRow) -> Self {
		Self {
			run_id: row.run_id,
			step_name: row.step_name,
			step_type: row.step_type,
			duration_ms: row.duration_ms,
			recorded_at: row.recorded_at,
			input_count: row.input_count,
			output_count: row.output_count,
			reduction_rate: row.reduction_rate,
			inputs: row.inputs,
			outputs: row.outputs,
			input_candidates: row.input_candidates,
			output_candidates: row.output_candidates,
			decisions: row.decisions,
			metadata: row.step_metadata,
			sample_rate: row.sample_rate,
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepListResponse {
	pub total: i64,
	pub items: Vec<StepTraceItem>,
}

impl XrayService {
	/// Queries steps across all runs — the cross-pipeline debugging surface.
	/// Numeric bounds are inclusive; results come back newest first.
	pub async fn list_steps(&self, req: StepListRequest) -> Result<StepListResponse> {
		let limit = self.page_limit(req.limit);
		let offset = req.offset.unwrap_or(0) as i64;

		let mut count_builder =
			QueryBuilder::new("SELECT COUNT(*) FROM step_traces JOIN pipeline_runs USING (run_id)");

		push_step_filters(&mut count_builder, &req);

		let total: i64 = count_builder.build_query_scalar().fetch_one(&self.db.pool).await?;

		let mut builder = QueryBuilder::new(
			"SELECT step_id, run_id, step_name, step_type, duration_ms, recorded_at, \
			 input_count, output_count, reduction_rate, inputs, outputs, input_candidates, \
			 output_candidates, decisions, step_metadata, sample_rate \
			 FROM step_traces JOIN pipeline_runs USING (run_id)",
		);

		push_step_filters(&mut builder, &req);
		builder.push(" ORDER BY recorded_at DESC LIMIT ");
		builder.push_bind(limit);
		builder.push(" OFFSET ");
		builder.push_bind(offset);

		let rows: Vec<StepTraceRow> = builder.build_query_as().fetch_all(&self.db.pool).await?;

		Ok(StepListResponse {
			total,
			items: rows.into_iter().map(StepTraceItem::from).collect(),
		})
	}
}

fn push_step_filters(builder: &mut QueryBuilder<'_, Postgres>, req: &StepListRequest) {
	builder.push(" WHERE TRUE");

	if let Some(step_name) = req.step_name.as_deref() {
		builder.push(" AND step_name = ");
		builder.push_bind(step_name.to_string());
	}
	if let Some(step_type) = req.step_type.as_deref() {
		builder.push(" AND step_type = ");
		builder.push_bind(step_type.to_string());
	}
	if let Some(min_reduction_rate) = req.min_reduction_rate {
		builder.push(" AND reduction_rate >= ");
		builder.push_bind(min_reduction_rate);
	}
	if let Some(max_reduction_rate) = req.max_reduction_rate {
		builder.push(" AND reduction_rate <= ");
		builder.push_bind(max_reduction_rate);
	}
	if let Some(min_duration_ms) = req.min_duration_ms {
		builder.push(" AND duration_ms >= ");
		builder.push_bind(min_duration_ms);
	}
	if let Some(max_duration_ms) = req.max_duration_ms {
		builder.push(" AND duration_ms <= ");
		builder.push_bind(max_duration_ms);
	}
	if let Some(pipeline_name) = req.pipeline_name.as_deref() {
		builder.push(" AND pipeline_name = ");
		builder.push_bind(pipeline_name.to_string());
	}
}
