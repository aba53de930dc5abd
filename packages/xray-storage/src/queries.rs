use sqlx::QueryBuilder;

use crate::{
	Result,
	db::Db,
	models::{InsertRun, InsertStep, PipelineRun, StepTraceRow},
};

/// Persists a run and all of its steps in one transaction. Re-ingesting an
/// existing `run_id` replaces the stored run; the delete cascades to the old
/// step rows, so a run is never visible with a mixed set of steps.
pub async fn replace_run(db: &Db, run: &InsertRun, steps: &[InsertStep]) -> Result<()> {
	let mut tx = db.pool.begin().await?;

	sqlx::query("DELETE FROM pipeline_runs WHERE run_id = $1")
		.bind(run.run_id.as_str())
		.execute(&mut *tx)
		.await?;

	sqlx::query(
		"\
INSERT INTO pipeline_runs (
	run_id,
	pipeline_name,
	pipeline_version,
	success,
	error,
	started_at,
	completed_at,
	total_duration_ms,
	context,
	tags,
	final_output
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
	)
	.bind(run.run_id.as_str())
	.bind(run.pipeline_name.as_str())
	.bind(run.pipeline_version.as_str())
	.bind(run.success)
	.bind(run.error.as_deref())
	.bind(run.started_at)
	.bind(run.completed_at)
	.bind(run.total_duration_ms)
	.bind(&run.context)
	.bind(&run.tags)
	.bind(run.final_output.as_ref())
	.execute(&mut *tx)
	.await?;

	if !steps.is_empty() {
		let mut builder = QueryBuilder::new(
			"\
INSERT INTO step_traces (
	run_id,
	step_name,
	step_type,
	duration_ms,
	recorded_at,
	input_count,
	output_count,
	reduction_rate,
	inputs,
	outputs,
	input_candidates,
	output_candidates,
	decisions,
	step_metadata,
	sample_rate
) ",
		);

		builder.push_values(steps, |mut b, step| {
			b.push_bind(run.run_id.as_str())
				.push_bind(step.step_name.as_str())
				.push_bind(step.step_type.as_str())
				.push_bind(step.duration_ms)
				.push_bind(step.recorded_at)
				.push_bind(step.input_count)
				.push_bind(step.output_count)
				.push_bind(step.reduction_rate)
				.push_bind(&step.inputs)
				.push_bind(&step.outputs)
				.push_bind(&step.input_candidates)
				.push_bind(&step.output_candidates)
				.push_bind(&step.decisions)
				.push_bind(&step.step_metadata)
				.push_bind(step.sample_rate);
		});
		builder.build().execute(&mut *tx).await?;
	}

	tx.commit().await?;

	Ok(())
}

pub async fn fetch_run(db: &Db, run_id: &str) -> Result<Option<PipelineRun>> {
	let run = sqlx::query_as::<_, PipelineRun>(
		"\
SELECT
	run_id,
	pipeline_name,
	pipeline_version,
	success,
	error,
	started_at,
	completed_at,
	total_duration_ms,
	context,
	tags,
	final_output,
	created_at
FROM pipeline_runs
WHERE run_id = $1",
	)
	.bind(run_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(run)
}

/// Steps come back in close order, `recorded_at` first and insertion order as
/// the tie breaker.
pub async fn fetch_run_steps(db: &Db, run_id: &str) -> Result<Vec<StepTraceRow>> {
	let steps = sqlx::query_as::<_, StepTraceRow>(
		"\
SELECT
	step_id,
	run_id,
	step_name,
	step_type,
	duration_ms,
	recorded_at,
	input_count,
	output_count,
	reduction_rate,
	inputs,
	outputs,
	input_candidates,
	output_candidates,
	decisions,
	step_metadata,
	sample_rate
FROM step_traces
WHERE run_id = $1
ORDER BY recorded_at ASC, step_id ASC",
	)
	.bind(run_id)
	.fetch_all(&db.pool)
	.await?;

	Ok(steps)
}

pub async fn count_run_steps(db: &Db, run_id: &str) -> Result<i64> {
	let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM step_traces WHERE run_id = $1")
		.bind(run_id)
		.fetch_one(&db.pool)
		.await?;

	Ok(count.0)
}

/// Returns whether a row was removed. Step rows go with it via the cascade.
pub async fn delete_run(db: &Db, run_id: &str) -> Result<bool> {
	let result = sqlx::query("DELETE FROM pipeline_runs WHERE run_id = $1")
		.bind(run_id)
		.execute(&db.pool)
		.await?;

	Ok(result.rows_affected() > 0)
}
