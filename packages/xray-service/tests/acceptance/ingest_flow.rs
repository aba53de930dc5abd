use xray_service::Error;

#[tokio::test]
#[ignore = "Requires external Postgres. Set XRAY_PG_DSN to run."]
async fn ingest_then_fetch_round_trips() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping ingest_then_fetch_round_trips; set XRAY_PG_DSN to run this test.");

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let service = super::build_service(cfg).await.expect("Failed to build service.");

	let mut run = super::sample_run("run-rt", "competitor_selection");

	run.steps.push(super::sample_step("filter", "filter", 300, 40));
	run.steps.push(super::sample_step("llm_rank", "llm_call", 40, 1));
	run.final_output = Some(serde_json::json!({ "selected": "prod-7" }));

	let response = service.ingest_run(run).await.expect("Failed to ingest run.");

	assert_eq!(response.status, "created");
	assert_eq!(response.run_id, "run-rt");

	let detail = service.get_run("run-rt").await.expect("Failed to fetch run.");

	assert_eq!(detail.pipeline_name, "competitor_selection");
	assert!(detail.success);
	assert_eq!(detail.steps.len(), 2);
	// Steps come back in close order with the stored reduction rates.
	assert_eq!(detail.steps[0].step_name, "filter");
	assert!((detail.steps[0].reduction_rate - (1.0 - 40.0 / 300.0)).abs() < 1e-9);
	assert_eq!(detail.steps[1].step_name, "llm_rank");
	assert_eq!(detail.steps[1].decisions.as_array().map(Vec::len), Some(1));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set XRAY_PG_DSN to run."]
async fn reingesting_a_run_id_replaces_the_stored_run() {
	let Some(test_db) = super::test_db().await else {
		eprintln!(
			"Skipping reingesting_a_run_id_replaces_the_stored_run; set XRAY_PG_DSN to run this test."
		);

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let service = super::build_service(cfg).await.expect("Failed to build service.");

	let mut first = super::sample_run("run-upsert", "listing_optimization");

	first.steps.push(super::sample_step("filter", "filter", 300, 40));
	first.steps.push(super::sample_step("rank", "rank", 40, 5));

	service.ingest_run(first).await.expect("Failed to ingest first run.");

	let mut second = super::sample_run("run-upsert", "listing_optimization");

	second.success = false;
	second.error = Some("provider timeout".to_string());
	second.steps.push(super::sample_step("filter", "filter", 300, 0));

	service.ingest_run(second).await.expect("Failed to re-ingest run.");

	let listed = service
		.list_runs(xray_service::RunListRequest {
			pipeline_name: Some("listing_optimization".to_string()),
			..Default::default()
		})
		.await
		.expect("Failed to list runs.");

	// Never two persisted copies for one run_id.
	assert_eq!(listed.total, 1);
	assert_eq!(listed.items.len(), 1);
	assert!(!listed.items[0].success);
	assert_eq!(listed.items[0].step_count, 1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set XRAY_PG_DSN to run."]
async fn ingest_rejects_blank_identifiers() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping ingest_rejects_blank_identifiers; set XRAY_PG_DSN to run this test.");

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let service = super::build_service(cfg).await.expect("Failed to build service.");

	let run = super::sample_run("   ", "competitor_selection");
	let err = service.ingest_run(run).await.expect_err("Expected a validation error.");

	assert!(matches!(err, Error::InvalidRequest { .. }), "Unexpected error: {err}");

	let run = super::sample_run("run-ok", "  ");
	let err = service.ingest_run(run).await.expect_err("Expected a validation error.");

	assert!(matches!(err, Error::InvalidRequest { .. }), "Unexpected error: {err}");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set XRAY_PG_DSN to run."]
async fn sampled_candidates_persist_alongside_exact_counts() {
	let Some(test_db) = super::test_db().await else {
		eprintln!(
			"Skipping sampled_candidates_persist_alongside_exact_counts; set XRAY_PG_DSN to run this test."
		);

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let service = super::build_service(cfg).await.expect("Failed to build service.");

	let mut run = super::sample_run("run-sampled", "competitor_selection");
	let mut step = xray_domain::StepTrace::new("prefilter", "filter");

	step.sample_rate = 0.1;
	step.input_candidates = super::candidates("in", 100);
	step.output_candidates = super::candidates("out", 100);
	step.add_decision("filtered_out", "price too high", serde_json::Map::new());
	xray_domain::apply_sampling(&mut step);
	run.steps.push(step);

	service.ingest_run(run).await.expect("Failed to ingest run.");

	let detail = service.get_run("run-sampled").await.expect("Failed to fetch run.");
	let step = &detail.steps[0];

	// Counts reflect the full lists even though the payload was sampled.
	assert_eq!(step.input_count, 100);
	assert_eq!(step.output_count, 100);
	assert!(step.input_candidates.as_array().map(Vec::len).unwrap_or(0) <= 10);
	assert_eq!(step.decisions.as_array().map(Vec::len), Some(1));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
