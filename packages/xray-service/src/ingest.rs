use serde::{Deserialize, Serialize};
use serde_json::Value;

use xray_domain::{RunTrace, StepTrace};
use xray_storage::{
	models::{InsertRun, InsertStep},
	queries,
};

use crate::{Error, Result, XrayService};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestResponse {
	pub status: String,
	pub run_id: String,
}

impl XrayService {
	/// Validates and persists a run document. The run row and all of its step
	/// rows land in one transaction; re-ingesting an existing `run_id`
	/// replaces the stored run and its steps.
	pub async fn ingest_run(&self, run: RunTrace) -> Result<IngestResponse> {
		let run_id = run.run_id.trim();

		if run_id.is_empty() {
			return Err(Error::InvalidRequest { message: "run_id is required.".to_string() });
		}
		if run.pipeline_name.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "pipeline_name is required.".to_string(),
			});
		}
		if let Some(completed_at) = run.completed_at
			&& completed_at < run.started_at
		{
			tracing::warn!(
				run_id,
				"Run completed_at precedes started_at; storing the document as supplied."
			);
		}

		let steps: Vec<InsertStep> =
			run.steps.iter().map(|step| build_insert_step(run_id, step)).collect::<Result<_>>()?;
		let insert = InsertRun {
			run_id: run_id.to_string(),
			pipeline_name: run.pipeline_name.trim().to_string(),
			pipeline_version: run.pipeline_version.clone(),
			success: run.success,
			error: run.error.clone(),
			started_at: run.started_at,
			completed_at: run.completed_at,
			total_duration_ms: run.total_duration_ms,
			context: Value::Object(run.context.clone()),
			tags: encode_field(&run.tags, "tags")?,
			final_output: run.final_output.clone(),
		};

		queries::replace_run(&self.db, &insert, &steps).await?;

		tracing::info!(run_id, steps = steps.len(), "Ingested pipeline run.");

		Ok(IngestResponse { status: "created".to_string(), run_id: run_id.to_string() })
	}
}

fn build_insert_step(run_id: &str, step: &StepTrace) -> Result<InsertStep> {
	if step.step_name.trim().is_empty() {
		return Err(Error::InvalidRequest {
			message: format!("Run {run_id} contains a step without a step_name."),
		});
	}

	let input_count = step.effective_input_count();
	let output_count = step.effective_output_count();

	Ok(InsertStep {
		step_name: step.step_name.clone(),
		step_type: step.step_type.clone(),
		duration_ms: step.duration_ms,
		recorded_at: step.recorded_at,
		input_count,
		output_count,
		reduction_rate: xray_domain::reduction_rate(input_count, output_count),
		inputs: Value::Object(step.inputs.clone()),
		outputs: Value::Object(step.outputs.clone()),
		input_candidates: encode_field(&step.input_candidates, "input_candidates")?,
		output_candidates: encode_field(&step.output_candidates, "output_candidates")?,
		decisions: encode_field(&step.decisions, "decisions")?,
		step_metadata: Value::Object(step.metadata.clone()),
		sample_rate: step.sample_rate,
	})
}

fn encode_field<T>(value: &T, label: &str) -> Result<Value>
where
	T: serde::Serialize,
{
	serde_json::to_value(value)
		.map_err(|err| Error::InvalidRequest { message: format!("Failed to encode {label}: {err}.") })
}
