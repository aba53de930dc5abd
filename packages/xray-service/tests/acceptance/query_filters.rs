use xray_service::{Error, RunListRequest, StepListRequest, StepPerformanceRequest};

#[tokio::test]
#[ignore = "Requires external Postgres. Set XRAY_PG_DSN to run."]
async fn context_filter_is_containment() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping context_filter_is_containment; set XRAY_PG_DSN to run this test.");

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let service = super::build_service(cfg).await.expect("Failed to build service.");

	// context = {"user_id": "usr_123", "region": "us"}
	let run = super::sample_run("run-ctx", "competitor_selection");

	service.ingest_run(run).await.expect("Failed to ingest run.");

	let matching = service
		.list_runs(RunListRequest {
			context: Some("{\"user_id\":\"usr_123\"}".to_string()),
			..Default::default()
		})
		.await
		.expect("Failed to list runs.");

	assert_eq!(matching.total, 1);

	let wrong_value = service
		.list_runs(RunListRequest {
			context: Some("{\"user_id\":\"usr_999\"}".to_string()),
			..Default::default()
		})
		.await
		.expect("Failed to list runs.");

	assert_eq!(wrong_value.total, 0);

	let conflicting_pair = service
		.list_runs(RunListRequest {
			context: Some("{\"user_id\":\"usr_123\",\"region\":\"eu\"}".to_string()),
			..Default::default()
		})
		.await
		.expect("Failed to list runs.");

	assert_eq!(conflicting_pair.total, 0);

	let err = service
		.list_runs(RunListRequest { context: Some("not json".to_string()), ..Default::default() })
		.await
		.expect_err("Expected a query error.");

	assert!(matches!(err, Error::InvalidQuery { .. }), "Unexpected error: {err}");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set XRAY_PG_DSN to run."]
async fn tag_and_success_filters_narrow_results() {
	let Some(test_db) = super::test_db().await else {
		eprintln!(
			"Skipping tag_and_success_filters_narrow_results; set XRAY_PG_DSN to run this test."
		);

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let service = super::build_service(cfg).await.expect("Failed to build service.");

	let tagged = super::sample_run("run-tagged", "competitor_selection");

	service.ingest_run(tagged).await.expect("Failed to ingest run.");

	let mut failed = super::sample_run("run-failed", "competitor_selection");

	failed.success = false;
	failed.error = Some("upstream 503".to_string());
	failed.tags = vec!["experiment-1".to_string()];

	service.ingest_run(failed).await.expect("Failed to ingest run.");

	let by_tag = service
		.list_runs(RunListRequest { tags: Some("team-a".to_string()), ..Default::default() })
		.await
		.expect("Failed to list runs.");

	assert_eq!(by_tag.total, 1);
	assert_eq!(by_tag.items[0].run_id, "run-tagged");

	let failures = service
		.list_runs(RunListRequest { success: Some(false), ..Default::default() })
		.await
		.expect("Failed to list runs.");

	assert_eq!(failures.total, 1);
	assert_eq!(failures.items[0].run_id, "run-failed");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set XRAY_PG_DSN to run."]
async fn reduction_rate_bounds_are_inclusive() {
	let Some(test_db) = super::test_db().await else {
		eprintln!(
			"Skipping reduction_rate_bounds_are_inclusive; set XRAY_PG_DSN to run this test."
		);

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let service = super::build_service(cfg).await.expect("Failed to build service.");

	let mut run = super::sample_run("run-steps", "competitor_selection");

	// filter removes 260/300 (~0.8667); llm_rank removes 39/40 (0.975).
	run.steps.push(super::sample_step("filter", "filter", 300, 40));
	run.steps.push(super::sample_step("llm_rank", "llm_call", 40, 1));

	service.ingest_run(run).await.expect("Failed to ingest run.");

	let above_point_eight = service
		.list_steps(StepListRequest { min_reduction_rate: Some(0.8), ..Default::default() })
		.await
		.expect("Failed to list steps.");

	assert_eq!(above_point_eight.total, 2);

	let above_point_ninety_five = service
		.list_steps(StepListRequest { min_reduction_rate: Some(0.95), ..Default::default() })
		.await
		.expect("Failed to list steps.");

	assert_eq!(above_point_ninety_five.total, 1);
	assert_eq!(above_point_ninety_five.items[0].step_name, "llm_rank");

	// The bound is inclusive: filtering at exactly 0.975 still matches.
	let exactly = service
		.list_steps(StepListRequest { min_reduction_rate: Some(0.975), ..Default::default() })
		.await
		.expect("Failed to list steps.");

	assert_eq!(exactly.total, 1);

	let by_type = service
		.list_steps(StepListRequest {
			step_type: Some("llm_call".to_string()),
			..Default::default()
		})
		.await
		.expect("Failed to list steps.");

	assert_eq!(by_type.total, 1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set XRAY_PG_DSN to run."]
async fn step_performance_groups_by_type_and_name() {
	let Some(test_db) = super::test_db().await else {
		eprintln!(
			"Skipping step_performance_groups_by_type_and_name; set XRAY_PG_DSN to run this test."
		);

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let service = super::build_service(cfg).await.expect("Failed to build service.");

	let mut first = super::sample_run("run-a", "competitor_selection");

	first.steps.push(super::sample_step("filter", "filter", 100, 20));

	let mut second = super::sample_run("run-b", "competitor_selection");

	second.steps.push(super::sample_step("filter", "filter", 100, 60));

	service.ingest_run(first).await.expect("Failed to ingest run.");
	service.ingest_run(second).await.expect("Failed to ingest run.");

	let report = service
		.step_performance(StepPerformanceRequest::default())
		.await
		.expect("Failed to compute analytics.");

	assert_eq!(report.analytics.len(), 1);

	let row = &report.analytics[0];

	assert_eq!(row.step_type, "filter");
	assert_eq!(row.step_name, "filter");
	assert_eq!(row.count, 2);
	// (0.8 + 0.4) / 2, rounded to three places by the service.
	assert!((row.avg_reduction_rate - 0.6).abs() < 1e-9);
	assert!((row.max_reduction_rate - 0.8).abs() < 1e-9);
	assert!((row.min_reduction_rate - 0.4).abs() < 1e-9);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
