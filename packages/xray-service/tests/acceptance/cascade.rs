use xray_service::{Error, StepListRequest};

#[tokio::test]
#[ignore = "Requires external Postgres. Set XRAY_PG_DSN to run."]
async fn deleting_a_run_removes_its_steps() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping deleting_a_run_removes_its_steps; set XRAY_PG_DSN to run this test.");

		return;
	};
	let cfg = super::test_config(test_db.dsn().to_string());
	let service = super::build_service(cfg).await.expect("Failed to build service.");

	let mut doomed = super::sample_run("run-doomed", "competitor_selection");

	doomed.steps.push(super::sample_step("filter", "filter", 300, 40));
	doomed.steps.push(super::sample_step("rank", "rank", 40, 5));

	let mut survivor = super::sample_run("run-survivor", "competitor_selection");

	survivor.steps.push(super::sample_step("filter", "filter", 10, 5));

	service.ingest_run(doomed).await.expect("Failed to ingest run.");
	service.ingest_run(survivor).await.expect("Failed to ingest run.");

	let response = service.delete_run("run-doomed").await.expect("Failed to delete run.");

	assert!(response.deleted);

	let err = service.get_run("run-doomed").await.expect_err("Expected the run to be gone.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err}");

	let steps = service
		.list_steps(StepListRequest::default())
		.await
		.expect("Failed to list steps.");

	// Only the surviving run's step remains.
	assert_eq!(steps.total, 1);
	assert_eq!(steps.items[0].run_id, "run-survivor");

	let err = service.delete_run("run-doomed").await.expect_err("Expected a not-found error.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err}");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
