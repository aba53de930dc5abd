use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

/// One item considered by a step. Never persisted on its own; always embedded
/// in a step's candidate lists, pre- or post-sampling.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Candidate {
	pub id: String,
	pub data: Value,
	#[serde(default)]
	pub score: Option<f64>,
	#[serde(default)]
	pub metadata: Map<String, Value>,
}

/// A recorded reasoning entry. Append-only within a step; chronological order
/// is preserved through serialization and persistence.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Decision {
	pub action: String,
	pub reason: String,
	#[serde(default)]
	pub criteria: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StepTrace {
	pub step_name: String,
	pub step_type: String,
	#[serde(default)]
	pub inputs: Map<String, Value>,
	#[serde(default)]
	pub outputs: Map<String, Value>,
	#[serde(default)]
	pub input_candidates: Vec<Candidate>,
	#[serde(default)]
	pub output_candidates: Vec<Candidate>,
	#[serde(default)]
	pub decisions: Vec<Decision>,
	#[serde(default)]
	pub duration_ms: Option<f64>,
	#[serde(rename = "timestamp", with = "crate::time_serde")]
	pub recorded_at: OffsetDateTime,
	#[serde(default)]
	pub metadata: Map<String, Value>,
	#[serde(default = "default_sample_rate")]
	pub sample_rate: f64,
	/// Exact counts, independent of sampling. When absent the collector falls
	/// back to the candidate-list lengths.
	#[serde(default)]
	pub input_count: Option<i64>,
	#[serde(default)]
	pub output_count: Option<i64>,
}
impl StepTrace {
	pub fn new(step_name: impl Into<String>, step_type: impl Into<String>) -> Self {
		Self {
			step_name: step_name.into(),
			step_type: step_type.into(),
			inputs: Map::new(),
			outputs: Map::new(),
			input_candidates: Vec::new(),
			output_candidates: Vec::new(),
			decisions: Vec::new(),
			duration_ms: None,
			recorded_at: OffsetDateTime::now_utc(),
			metadata: Map::new(),
			sample_rate: 1.0,
			input_count: None,
			output_count: None,
		}
	}

	pub fn add_decision(
		&mut self,
		action: impl Into<String>,
		reason: impl Into<String>,
		criteria: Map<String, Value>,
	) {
		self.decisions.push(Decision { action: action.into(), reason: reason.into(), criteria });
	}

	pub fn effective_input_count(&self) -> i64 {
		self.input_count.unwrap_or(self.input_candidates.len() as i64)
	}

	pub fn effective_output_count(&self) -> i64 {
		self.output_count.unwrap_or(self.output_candidates.len() as i64)
	}

	pub fn reduction(&self) -> f64 {
		reduction_rate(self.effective_input_count(), self.effective_output_count())
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RunTrace {
	pub run_id: String,
	pub pipeline_name: String,
	pub pipeline_version: String,
	#[serde(default = "default_success")]
	pub success: bool,
	#[serde(default)]
	pub error: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub started_at: OffsetDateTime,
	#[serde(default, with = "crate::time_serde::option")]
	pub completed_at: Option<OffsetDateTime>,
	#[serde(default)]
	pub total_duration_ms: Option<f64>,
	#[serde(default)]
	pub context: Map<String, Value>,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default)]
	pub final_output: Option<Value>,
	#[serde(default)]
	pub steps: Vec<StepTrace>,
}
impl RunTrace {
	pub fn new(
		run_id: impl Into<String>,
		pipeline_name: impl Into<String>,
		pipeline_version: impl Into<String>,
	) -> Self {
		Self {
			run_id: run_id.into(),
			pipeline_name: pipeline_name.into(),
			pipeline_version: pipeline_version.into(),
			success: true,
			error: None,
			started_at: OffsetDateTime::now_utc(),
			completed_at: None,
			total_duration_ms: None,
			context: Map::new(),
			tags: Vec::new(),
			final_output: None,
			steps: Vec::new(),
		}
	}
}

/// Fraction of input items a step removed. Steps may enrich rather than
/// reduce, so the result can be negative; a zero input count yields 0 rather
/// than a division fault.
pub fn reduction_rate(input_count: i64, output_count: i64) -> f64 {
	if input_count <= 0 {
		return 0.0;
	}

	1.0 - output_count as f64 / input_count as f64
}

fn default_sample_rate() -> f64 {
	1.0
}

fn default_success() -> bool {
	true
}
