use std::time::Instant;

use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use xray_domain::{Candidate, RunTrace, StepTrace, apply_sampling};

use crate::Tracer;

struct RunInner {
	run: RunTrace,
	started: Instant,
}

/// Scope of one pipeline run. All mutation happens synchronously on the
/// caller; the only async boundary is the queue hand-off at close. Dropping
/// the guard finalizes and submits the run; a disabled tracer hands out an
/// inert guard with zero buffering overhead.
pub struct RunGuard<'a> {
	tracer: &'a Tracer,
	inner: Option<RunInner>,
	closed: bool,
}
impl<'a> RunGuard<'a> {
	pub(crate) fn open(tracer: &'a Tracer) -> Self {
		let inner = tracer.is_enabled().then(|| {
			let mut run = RunTrace::new(
				Uuid::new_v4().to_string(),
				tracer.pipeline_name(),
				tracer.pipeline_version(),
			);

			run.started_at = OffsetDateTime::now_utc();

			RunInner { run, started: Instant::now() }
		});

		Self { tracer, inner, closed: false }
	}

	pub fn run_id(&self) -> Option<&str> {
		self.inner.as_ref().map(|inner| inner.run.run_id.as_str())
	}

	/// Overrides the generated run identifier. Re-using an identifier makes
	/// the collector replace the previously stored run.
	pub fn set_run_id(&mut self, run_id: impl Into<String>) {
		if let Some(inner) = self.inner.as_mut() {
			inner.run.run_id = run_id.into();
		}
	}

	pub fn set_context(&mut self, context: Map<String, Value>) {
		if let Some(inner) = self.inner.as_mut() {
			inner.run.context = context;
		}
	}

	pub fn insert_context(&mut self, key: impl Into<String>, value: Value) {
		if let Some(inner) = self.inner.as_mut() {
			inner.run.context.insert(key.into(), value);
		}
	}

	pub fn set_tags(&mut self, tags: Vec<String>) {
		if let Some(inner) = self.inner.as_mut() {
			inner.run.tags = tags;
		}
	}

	pub fn add_tag(&mut self, tag: impl Into<String>) {
		if let Some(inner) = self.inner.as_mut() {
			inner.run.tags.push(tag.into());
		}
	}

	pub fn set_final_output(&mut self, output: Value) {
		if let Some(inner) = self.inner.as_mut() {
			inner.run.final_output = Some(output);
		}
	}

	/// Records a pipeline fault. The run is marked failed with the error
	/// detail and still delivered at close; the caller keeps propagating its
	/// own error — capture never swallows or replaces it.
	pub fn fail(&mut self, error: impl Into<String>) {
		if let Some(inner) = self.inner.as_mut() {
			inner.run.success = false;
			inner.run.error = Some(error.into());
		}
	}

	/// Opens a step scope capturing every candidate.
	pub fn step(&mut self, step_name: &str, step_type: &str) -> StepGuard<'a, '_> {
		self.step_sampled(step_name, step_type, 1.0)
	}

	/// Opens a step scope that retains only a `sample_rate` fraction of its
	/// candidate payloads. Decisions and exact counts are kept regardless.
	pub fn step_sampled(
		&mut self,
		step_name: &str,
		step_type: &str,
		sample_rate: f64,
	) -> StepGuard<'a, '_> {
		let step = self.inner.as_ref().map(|_| {
			let mut step = StepTrace::new(step_name, step_type);

			step.sample_rate = sample_rate;

			step
		});

		StepGuard { run: self, step, started: Instant::now(), closed: false }
	}

	/// Explicit close. Equivalent to dropping the guard, spelled out at call
	/// sites that want the hand-off to be visible.
	pub fn finish(mut self) {
		self.close_internal();
	}

	/// Finalizes the run and returns the document instead of submitting it.
	/// Local-only inspection path; returns `None` on a disabled tracer.
	pub fn into_trace(mut self) -> Option<RunTrace> {
		self.closed = true;

		self.inner.take().map(|inner| finalize_run(inner))
	}

	fn close_internal(&mut self) {
		if self.closed {
			tracing::warn!("Run guard closed twice; ignoring the second close.");

			return;
		}

		self.closed = true;

		let Some(inner) = self.inner.take() else {
			return;
		};
		let run = finalize_run(inner);

		match serde_json::to_string(&run) {
			Ok(payload) => self.tracer.submit(payload),
			Err(err) => {
				// Capture failure stays isolated; the producer's control flow
				// is never touched.
				tracing::warn!(error = %err, run_id = run.run_id, "Failed to encode run; dropping it.");
			},
		}
	}
}
impl Drop for RunGuard<'_> {
	fn drop(&mut self) {
		if !self.closed {
			self.close_internal();
		}
	}
}

fn finalize_run(inner: RunInner) -> RunTrace {
	let mut run = inner.run;

	run.completed_at = Some(OffsetDateTime::now_utc());
	run.total_duration_ms = Some(inner.started.elapsed().as_secs_f64() * 1_000.0);

	run
}

/// Scope of one step within a run. Dropping the guard computes the duration
/// from a monotonic clock, pins exact counts, applies the sampling policy,
/// and appends the step to the owning run.
pub struct StepGuard<'a, 'b> {
	run: &'b mut RunGuard<'a>,
	step: Option<StepTrace>,
	started: Instant,
	closed: bool,
}
impl StepGuard<'_, '_> {
	pub fn set_input(&mut self, inputs: Map<String, Value>) {
		if let Some(step) = self.step.as_mut() {
			step.inputs = inputs;
		}
	}

	pub fn set_output(&mut self, outputs: Map<String, Value>) {
		if let Some(step) = self.step.as_mut() {
			step.outputs = outputs;
		}
	}

	pub fn set_input_candidates(&mut self, candidates: Vec<Candidate>) {
		if let Some(step) = self.step.as_mut() {
			step.input_candidates = candidates;
		}
	}

	pub fn set_output_candidates(&mut self, candidates: Vec<Candidate>) {
		if let Some(step) = self.step.as_mut() {
			step.output_candidates = candidates;
		}
	}

	pub fn add_input_candidate(&mut self, candidate: Candidate) {
		if let Some(step) = self.step.as_mut() {
			step.input_candidates.push(candidate);
		}
	}

	pub fn add_output_candidate(&mut self, candidate: Candidate) {
		if let Some(step) = self.step.as_mut() {
			step.output_candidates.push(candidate);
		}
	}

	/// Summary form: supplies exact counts directly instead of candidate
	/// payloads. Sampling never re-derives counts once they are set.
	pub fn set_counts(&mut self, input_count: i64, output_count: i64) {
		if let Some(step) = self.step.as_mut() {
			step.input_count = Some(input_count);
			step.output_count = Some(output_count);
		}
	}

	/// Decisions are always captured in full, whatever the sample rate.
	pub fn add_decision(
		&mut self,
		action: impl Into<String>,
		reason: impl Into<String>,
		criteria: Map<String, Value>,
	) {
		if let Some(step) = self.step.as_mut() {
			step.add_decision(action, reason, criteria);
		}
	}

	pub fn add_metadata(&mut self, key: impl Into<String>, value: Value) {
		if let Some(step) = self.step.as_mut() {
			step.metadata.insert(key.into(), value);
		}
	}

	/// Marks the step with an error detail and fails the owning run. Use on
	/// the error arm before propagating the fault upward.
	pub fn record_error(&mut self, error: impl Into<String>) {
		let error = error.into();

		if let Some(step) = self.step.as_mut() {
			step.metadata.insert("error".to_string(), Value::String(error.clone()));
		}

		self.run.fail(error);
	}

	pub fn finish(mut self) {
		self.close_internal();
	}

	fn close_internal(&mut self) {
		if self.closed {
			tracing::warn!("Step guard closed twice; ignoring the second close.");

			return;
		}

		self.closed = true;

		let Some(mut step) = self.step.take() else {
			return;
		};

		step.duration_ms = Some(self.started.elapsed().as_secs_f64() * 1_000.0);

		if step.input_count.is_none() {
			step.input_count = Some(step.input_candidates.len() as i64);
		}
		if step.output_count.is_none() {
			step.output_count = Some(step.output_candidates.len() as i64);
		}

		apply_sampling(&mut step);

		if let Some(inner) = self.run.inner.as_mut() {
			inner.run.steps.push(step);
		}
	}
}
impl Drop for StepGuard<'_, '_> {
	fn drop(&mut self) {
		if !self.closed {
			self.close_internal();
		}
	}
}
