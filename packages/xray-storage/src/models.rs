use serde_json::Value;
use time::OffsetDateTime;

#[derive(Debug, sqlx::FromRow)]
pub struct PipelineRun {
	pub run_id: String,
	pub pipeline_name: String,
	pub pipeline_version: String,
	pub success: bool,
	pub error: Option<String>,
	pub started_at: OffsetDateTime,
	pub completed_at: Option<OffsetDateTime>,
	pub total_duration_ms: Option<f64>,
	pub context: Value,
	pub tags: Value,
	pub final_output: Option<Value>,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct StepTraceRow {
	pub step_id: i64,
	pub run_id: String,
	pub step_name: String,
	pub step_type: String,
	pub duration_ms: Option<f64>,
	pub recorded_at: OffsetDateTime,
	pub input_count: i64,
	pub output_count: i64,
	pub reduction_rate: f64,
	pub inputs: Value,
	pub outputs: Value,
	pub input_candidates: Value,
	pub output_candidates: Value,
	pub decisions: Value,
	pub step_metadata: Value,
	pub sample_rate: f64,
}

/// Run row ready for insertion, with the document fields already encoded.
#[derive(Debug)]
pub struct InsertRun {
	pub run_id: String,
	pub pipeline_name: String,
	pub pipeline_version: String,
	pub success: bool,
	pub error: Option<String>,
	pub started_at: OffsetDateTime,
	pub completed_at: Option<OffsetDateTime>,
	pub total_duration_ms: Option<f64>,
	pub context: Value,
	pub tags: Value,
	pub final_output: Option<Value>,
}

/// Step row ready for insertion. Counts and reduction rate are resolved by
/// the service before this struct is built.
#[derive(Debug)]
pub struct InsertStep {
	pub step_name: String,
	pub step_type: String,
	pub duration_ms: Option<f64>,
	pub recorded_at: OffsetDateTime,
	pub input_count: i64,
	pub output_count: i64,
	pub reduction_rate: f64,
	pub inputs: Value,
	pub outputs: Value,
	pub input_candidates: Value,
	pub output_candidates: Value,
	pub decisions: Value,
	pub step_metadata: Value,
	pub sample_rate: f64,
}
