use serde_json::Map;
use time::macros::datetime;

use xray_domain::{RunTrace, StepTrace};

#[test]
fn step_wire_shape_uses_timestamp_field() {
	let mut step = StepTrace::new("keyword_generation", "llm_call");

	step.recorded_at = datetime!(2026-03-01 12:00:00 UTC);
	step.duration_ms = Some(41.5);

	let value = serde_json::to_value(&step).expect("Failed to encode step.");

	assert_eq!(value["step_name"], "keyword_generation");
	assert_eq!(value["step_type"], "llm_call");
	assert_eq!(value["timestamp"], "2026-03-01T12:00:00Z");
	assert!(value.get("recorded_at").is_none());
}

#[test]
fn sparse_run_document_deserializes_with_defaults() {
	let raw = serde_json::json!({
		"run_id": "run-123",
		"pipeline_name": "competitor_selection",
		"pipeline_version": "1.0",
		"started_at": "2026-03-01T12:00:00Z",
		"steps": [{
			"step_name": "price_filter",
			"step_type": "filter",
			"timestamp": "2026-03-01T12:00:01Z"
		}]
	});
	let run: RunTrace = serde_json::from_value(raw).expect("Failed to decode run.");

	assert!(run.success);
	assert!(run.error.is_none());
	assert!(run.context.is_empty());
	assert!(run.tags.is_empty());
	assert_eq!(run.steps.len(), 1);

	let step = &run.steps[0];

	assert_eq!(step.sample_rate, 1.0);
	assert!(step.input_candidates.is_empty());
	assert!(step.decisions.is_empty());
	assert_eq!(step.input_count, None);
}

#[test]
fn failed_run_round_trips_error_detail() {
	let mut run = RunTrace::new("run-9", "listing_optimization", "2.1");

	run.success = false;
	run.error = Some("search provider returned 503".to_string());
	run.completed_at = Some(datetime!(2026-03-01 12:00:05 UTC));
	run.total_duration_ms = Some(5_000.0);
	run.context.insert("user_id".to_string(), serde_json::json!("usr_123"));
	run.tags.push("experiment-1".to_string());

	let encoded = serde_json::to_string(&run).expect("Failed to encode run.");
	let decoded: RunTrace = serde_json::from_str(&encoded).expect("Failed to decode run.");

	assert!(!decoded.success);
	assert_eq!(decoded.error.as_deref(), Some("search provider returned 503"));
	assert_eq!(decoded.completed_at, Some(datetime!(2026-03-01 12:00:05 UTC)));
	assert_eq!(decoded.context["user_id"], "usr_123");
	assert_eq!(decoded.tags, vec!["experiment-1".to_string()]);
}

#[test]
fn decision_criteria_defaults_to_empty_map() {
	let raw = serde_json::json!({
		"action": "filtered_out",
		"reason": "Price 299 exceeds max 250"
	});
	let decision: xray_domain::Decision =
		serde_json::from_value(raw).expect("Failed to decode decision.");

	assert_eq!(decision.action, "filtered_out");
	assert_eq!(decision.criteria, Map::new());
}
