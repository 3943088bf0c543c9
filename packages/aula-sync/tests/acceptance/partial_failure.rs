use std::sync::Arc;

use time::OffsetDateTime;

use aula_domain::{FileErrorKind, FileStatus, RunStatus, SourceFile};
use aula_storage::ledger;
use aula_sync::{ListFilesRequest, Providers, SearchRequest, SyncRequest};

use super::{StubCampus, StubEmbedding, VECTOR_DIM};

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set AULA_PG_DSN and AULA_QDRANT_URL to run."]
async fn one_bad_file_does_not_sink_the_run() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping one_bad_file_does_not_sink_the_run; set AULA_PG_DSN to run this test.");

		return;
	};
	let Some(qdrant_url) = super::test_qdrant_url() else {
		eprintln!(
			"Skipping one_bad_file_does_not_sink_the_run; set AULA_QDRANT_URL to run this test."
		);

		return;
	};
	let campus = StubCampus::new();
	let modified_at =
		OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("Invalid test timestamp.");

	campus.set_course(
		"bio-110",
		vec![
			super::text_file("f-cells", "cells.txt", 1_700_000_000, "Cells divide by mitosis."),
			(
				SourceFile {
					id: "f-bin".to_string(),
					name: "dataset.bin".to_string(),
					mime_type: Some("application/octet-stream".to_string()),
					modified_at: Some(modified_at),
					download_url: "https://campus.test/files/f-bin".to_string(),
				},
				vec![0_u8, 159, 146, 150],
			),
			super::text_file("f-dna", "dna.txt", 1_700_000_100, "DNA carries genetic code."),
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

	super::track_course(&test_db, &cfg, "bio-110");

	let service = super::build_service(cfg, providers).await;

	service
		.request_sync(SyncRequest { course_id: "bio-110".to_string() })
		.await
		.expect("Failed to request sync.");

	let outcome = super::drive_one_run(&service).await;

	// The run itself completes; only the unreadable file is marked failed.
	assert_eq!(outcome.status, RunStatus::Completed);

	let summary = outcome.summary.expect("Missing run summary.");

	assert_eq!(summary.added, 2);
	assert_eq!(summary.failed, 1);
	assert_eq!(summary.failures.len(), 1);
	assert_eq!(summary.failures[0].file_id, "f-bin");
	assert_eq!(summary.failures[0].kind, FileErrorKind::Extraction);
	assert!(summary.failures[0].message.contains("Unsupported document type"));

	let entry = ledger::fetch_entry(&service.db, "bio-110", "f-bin")
		.await
		.expect("Failed to fetch ledger entry.")
		.expect("Missing ledger entry.");

	assert_eq!(entry.status, "error");
	assert!(entry.last_error.expect("Missing last_error.").contains("Unsupported"));

	let listing = service
		.list_files(ListFilesRequest { course_id: "bio-110".to_string() })
		.await
		.expect("Failed to list files.");
	let failed: Vec<_> =
		listing.files.iter().filter(|entry| entry.status == FileStatus::Error).collect();

	assert_eq!(listing.files.len(), 3);
	assert_eq!(failed.len(), 1);
	assert_eq!(failed[0].file_id, "f-bin");

	// The readable files are still searchable.
	let results = service
		.search(SearchRequest {
			course_id: "bio-110".to_string(),
			query: "Cells divide by mitosis.".to_string(),
			limit: None,
		})
		.await
		.expect("Failed to search.");

	assert!(!results.items.is_empty());
	assert_eq!(results.items[0].file_id, "f-cells");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
