use std::sync::Arc;

use aula_domain::{FileStatus, RunStatus};
use aula_sync::{ListFilesRequest, Providers, SearchRequest, SyncRequest, TaskStatusRequest};

use super::{StubCampus, StubEmbedding, VECTOR_DIM};

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set AULA_PG_DSN and AULA_QDRANT_URL to run."]
async fn full_sync_indexes_course_files() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping full_sync_indexes_course_files; set AULA_PG_DSN to run this test.");

		return;
	};
	let Some(qdrant_url) = super::test_qdrant_url() else {
		eprintln!("Skipping full_sync_indexes_course_files; set AULA_QDRANT_URL to run this test.");

		return;
	};
	let campus = StubCampus::new();

	campus.set_course(
		"algebra-101",
		vec![
			super::text_file(
				"f-syllabus",
				"syllabus.txt",
				1_700_000_000,
				"Derivatives measure change.",
			),
			super::text_file("f-notes", "notes.txt", 1_700_000_100, "Integrals accumulate area."),
		],
	);

	let providers = Providers::new(
		Arc::new(StubEmbedding { vector_dim: VECTOR_DIM }),
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
	let accepted = service
		.request_sync(SyncRequest { course_id: "algebra-101".to_string() })
		.await
		.expect("Failed to request sync.");

	assert_eq!(accepted.status, RunStatus::Queued);
	assert_eq!(accepted.course_id, "algebra-101");

	let outcome = super::drive_one_run(&service).await;

	assert_eq!(outcome.run_id, accepted.run_id);
	assert_eq!(outcome.status, RunStatus::Completed);

	let summary = outcome.summary.expect("Missing run summary.");

	assert_eq!(summary.added, 2);
	assert_eq!(summary.updated, 0);
	assert_eq!(summary.removed, 0);
	assert_eq!(summary.failed, 0);

	let listing = service
		.list_files(ListFilesRequest { course_id: "algebra-101".to_string() })
		.await
		.expect("Failed to list files.");

	assert_eq!(listing.files.len(), 2);

	for entry in &listing.files {
		assert_eq!(entry.status, FileStatus::Completed);
		assert!(entry.chunk_count > 0);
		assert!(entry.fingerprint.starts_with("mtime:"));
		assert!(entry.processed_at.is_some());
		assert!(entry.last_error.is_none());
	}

	let status = service
		.task_status(TaskStatusRequest { run_id: accepted.run_id })
		.await
		.expect("Failed to fetch task status.");

	assert_eq!(status.status, RunStatus::Completed);
	assert!(status.started_at.is_some());
	assert!(status.finished_at.is_some());
	assert_eq!(status.summary.expect("Missing status summary.").added, 2);

	let results = service
		.search(SearchRequest {
			course_id: "algebra-101".to_string(),
			query: "Derivatives measure change.".to_string(),
			limit: Some(4),
		})
		.await
		.expect("Failed to search.");

	assert!(!results.items.is_empty());
	assert_eq!(results.items[0].file_id, "f-syllabus");
	assert_eq!(results.items[0].file_name, "syllabus.txt");
	assert!(results.items[0].text.contains("Derivatives"));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
