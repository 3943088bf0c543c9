use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};

use aula_domain::{FileErrorKind, RunStatus};
use aula_storage::ledger;
use aula_sync::{Providers, SyncRequest};

use super::{FlakyEmbedding, RejectedEmbedding, StubCampus, VECTOR_DIM};

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set AULA_PG_DSN and AULA_QDRANT_URL to run."]
async fn transient_embedding_failures_are_retried() {
	let Some(test_db) = super::test_db().await else {
		eprintln!(
			"Skipping transient_embedding_failures_are_retried; set AULA_PG_DSN to run this test."
		);

		return;
	};
	let Some(qdrant_url) = super::test_qdrant_url() else {
		eprintln!(
			"Skipping transient_embedding_failures_are_retried; set AULA_QDRANT_URL to run this test."
		);

		return;
	};
	let campus = StubCampus::new();

	campus.set_course(
		"phys-220",
		vec![super::text_file("f-1", "waves.txt", 1_700_000_000, "Waves carry energy.")],
	);

	let calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(FlakyEmbedding {
			vector_dim: VECTOR_DIM,
			failures_remaining: Arc::new(AtomicUsize::new(1)),
			calls: calls.clone(),
		}),
		Arc::new(campus.clone()),
	);
	let cfg = super::test_config(
		test_db.dsn().to_string(),
		qdrant_url,
		VECTOR_DIM,
		test_db.collection_prefix(),
	);

	super::track_course(&test_db, &cfg, "phys-220");

	let service = super::build_service(cfg, providers).await;

	service
		.request_sync(SyncRequest { course_id: "phys-220".to_string() })
		.await
		.expect("Failed to request sync.");

	let outcome = super::drive_one_run(&service).await;

	assert_eq!(outcome.status, RunStatus::Completed);

	let summary = outcome.summary.expect("Missing run summary.");

	assert_eq!(summary.added, 1);
	assert_eq!(summary.failed, 0);
	// First call failed, the retry succeeded.
	assert!(calls.load(Ordering::SeqCst) >= 2);

	let entry = ledger::fetch_entry(&service.db, "phys-220", "f-1")
		.await
		.expect("Failed to fetch ledger entry.")
		.expect("Missing ledger entry.");

	assert_eq!(entry.status, "completed");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set AULA_PG_DSN and AULA_QDRANT_URL to run."]
async fn rejected_embeddings_fail_without_retry() {
	let Some(test_db) = super::test_db().await else {
		eprintln!(
			"Skipping rejected_embeddings_fail_without_retry; set AULA_PG_DSN to run this test."
		);

		return;
	};
	let Some(qdrant_url) = super::test_qdrant_url() else {
		eprintln!(
			"Skipping rejected_embeddings_fail_without_retry; set AULA_QDRANT_URL to run this test."
		);

		return;
	};
	let campus = StubCampus::new();

	campus.set_course(
		"phys-220",
		vec![super::text_file("f-1", "waves.txt", 1_700_000_000, "Waves carry energy.")],
	);

	let calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(RejectedEmbedding { calls: calls.clone() }),
		Arc::new(campus.clone()),
	);
	let cfg = super::test_config(
		test_db.dsn().to_string(),
		qdrant_url,
		VECTOR_DIM,
		test_db.collection_prefix(),
	);

	super::track_course(&test_db, &cfg, "phys-220");

	let service = super::build_service(cfg, providers).await;

	service
		.request_sync(SyncRequest { course_id: "phys-220".to_string() })
		.await
		.expect("Failed to request sync.");

	let outcome = super::drive_one_run(&service).await;

	// The run survives; the file lands in error without a retry storm.
	assert_eq!(outcome.status, RunStatus::Completed);

	let summary = outcome.summary.expect("Missing run summary.");

	assert_eq!(summary.failed, 1);
	assert_eq!(summary.failures[0].kind, FileErrorKind::Input);
	assert_eq!(calls.load(Ordering::SeqCst), 1);

	let entry = ledger::fetch_entry(&service.db, "phys-220", "f-1")
		.await
		.expect("Failed to fetch ledger entry.")
		.expect("Missing ledger entry.");

	assert_eq!(entry.status, "error");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
