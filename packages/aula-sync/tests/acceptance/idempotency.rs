use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};

use aula_domain::RunStatus;
use aula_storage::ledger;
use aula_sync::{Providers, SyncRequest};

use super::{SpyEmbedding, StubCampus, VECTOR_DIM};

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set AULA_PG_DSN and AULA_QDRANT_URL to run."]
async fn resync_skips_unchanged_files() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping resync_skips_unchanged_files; set AULA_PG_DSN to run this test.");

		return;
	};
	let Some(qdrant_url) = super::test_qdrant_url() else {
		eprintln!("Skipping resync_skips_unchanged_files; set AULA_QDRANT_URL to run this test.");

		return;
	};
	let campus = StubCampus::new();

	campus.set_course(
		"algebra-101",
		vec![
			super::text_file("f-1", "week1.txt", 1_700_000_000, "Limits and continuity."),
			super::text_file("f-2", "week2.txt", 1_700_000_050, "Chain rule practice."),
		],
	);

	let calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(SpyEmbedding { vector_dim: VECTOR_DIM, calls: calls.clone() }),
		Arc::new(campus.clone()),
	);
	let cfg = super::test_config(
		test_db.dsn().to_string(),
		qdrant_url,
		VECTOR_DIM,
		test_db.collection_prefix(),
	);

	super::track_course(&test_db, &cfg, "algebra-101");

	let service = super::build_service(cfg, providers).await;

	service
		.request_sync(SyncRequest { course_id: "algebra-101".to_string() })
		.await
		.expect("Failed to request first sync.");

	let first = super::drive_one_run(&service).await;

	assert_eq!(first.status, RunStatus::Completed);
	assert_eq!(first.summary.as_ref().expect("Missing first summary.").added, 2);

	let embed_calls = calls.load(Ordering::SeqCst);
	let downloads = campus.download_count();
	let entry_before = ledger::fetch_entry(&service.db, "algebra-101", "f-1")
		.await
		.expect("Failed to fetch ledger entry.")
		.expect("Missing ledger entry.");

	service
		.request_sync(SyncRequest { course_id: "algebra-101".to_string() })
		.await
		.expect("Failed to request second sync.");

	let second = super::drive_one_run(&service).await;
	let summary = second.summary.expect("Missing second summary.");

	assert_eq!(summary.added, 0);
	assert_eq!(summary.updated, 0);
	assert_eq!(summary.unchanged, 2);
	assert_eq!(summary.failed, 0);

	// Nothing was re-fetched or re-embedded.
	assert_eq!(calls.load(Ordering::SeqCst), embed_calls);
	assert_eq!(campus.download_count(), downloads);

	let entry_after = ledger::fetch_entry(&service.db, "algebra-101", "f-1")
		.await
		.expect("Failed to fetch ledger entry.")
		.expect("Missing ledger entry.");

	assert_eq!(entry_after.fingerprint, entry_before.fingerprint);
	assert_eq!(entry_after.processed_at, entry_before.processed_at);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set AULA_PG_DSN and AULA_QDRANT_URL to run."]
async fn modified_file_is_reindexed() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping modified_file_is_reindexed; set AULA_PG_DSN to run this test.");

		return;
	};
	let Some(qdrant_url) = super::test_qdrant_url() else {
		eprintln!("Skipping modified_file_is_reindexed; set AULA_QDRANT_URL to run this test.");

		return;
	};
	let campus = StubCampus::new();

	campus.set_course(
		"algebra-101",
		vec![
			super::text_file("f-1", "week1.txt", 1_700_000_000, "Limits and continuity."),
			super::text_file("f-2", "week2.txt", 1_700_000_050, "Chain rule practice."),
		],
	);

	let calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(SpyEmbedding { vector_dim: VECTOR_DIM, calls: calls.clone() }),
		Arc::new(campus.clone()),
	);
	let cfg = super::test_config(
		test_db.dsn().to_string(),
		qdrant_url,
		VECTOR_DIM,
		test_db.collection_prefix(),
	);

	super::track_course(&test_db, &cfg, "algebra-101");

	let service = super::build_service(cfg, providers).await;

	service
		.request_sync(SyncRequest { course_id: "algebra-101".to_string() })
		.await
		.expect("Failed to request first sync.");
	super::drive_one_run(&service).await;

	let embed_calls = calls.load(Ordering::SeqCst);

	// The platform reports a newer version of week2.
	campus.set_course(
		"algebra-101",
		vec![
			super::text_file("f-1", "week1.txt", 1_700_000_000, "Limits and continuity."),
			super::text_file("f-2", "week2.txt", 1_700_000_200, "Chain rule, reworked."),
		],
	);
	service
		.request_sync(SyncRequest { course_id: "algebra-101".to_string() })
		.await
		.expect("Failed to request second sync.");

	let second = super::drive_one_run(&service).await;
	let summary = second.summary.expect("Missing second summary.");

	assert_eq!(summary.added, 0);
	assert_eq!(summary.updated, 1);
	assert_eq!(summary.unchanged, 1);
	assert!(calls.load(Ordering::SeqCst) > embed_calls);

	let entry = ledger::fetch_entry(&service.db, "algebra-101", "f-2")
		.await
		.expect("Failed to fetch ledger entry.")
		.expect("Missing ledger entry.");

	assert_eq!(entry.fingerprint, "mtime:1700000200");
	assert_eq!(entry.status, "completed");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
