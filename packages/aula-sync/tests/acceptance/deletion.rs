use std::sync::Arc;

use aula_storage::ledger;
use aula_sync::{ListFilesRequest, Providers, SearchRequest, SyncRequest};

use super::{StubCampus, StubEmbedding, VECTOR_DIM};

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set AULA_PG_DSN and AULA_QDRANT_URL to run."]
async fn delisted_files_are_removed_from_ledger_and_index() {
	let Some(test_db) = super::test_db().await else {
		eprintln!(
			"Skipping delisted_files_are_removed_from_ledger_and_index; set AULA_PG_DSN to run this test."
		);

		return;
	};
	let Some(qdrant_url) = super::test_qdrant_url() else {
		eprintln!(
			"Skipping delisted_files_are_removed_from_ledger_and_index; set AULA_QDRANT_URL to run this test."
		);

		return;
	};
	let campus = StubCampus::new();

	campus.set_course(
		"econ-201",
		vec![
			super::text_file("f-keep", "supply.txt", 1_700_000_000, "Supply curves slope upward."),
			super::text_file("f-drop", "demand.txt", 1_700_000_050, "Demand curves slope downward."),
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

	super::track_course(&test_db, &cfg, "econ-201");

	let service = super::build_service(cfg, providers).await;

	service
		.request_sync(SyncRequest { course_id: "econ-201".to_string() })
		.await
		.expect("Failed to request first sync.");
	super::drive_one_run(&service).await;

	// The platform no longer lists demand.txt.
	campus.delist_file("econ-201", "f-drop");
	service
		.request_sync(SyncRequest { course_id: "econ-201".to_string() })
		.await
		.expect("Failed to request second sync.");

	let outcome = super::drive_one_run(&service).await;
	let summary = outcome.summary.expect("Missing run summary.");

	assert_eq!(summary.removed, 1);
	assert_eq!(summary.unchanged, 1);
	assert_eq!(summary.failed, 0);

	let dropped = ledger::fetch_entry(&service.db, "econ-201", "f-drop")
		.await
		.expect("Failed to fetch ledger entry.");

	assert!(dropped.is_none());

	let listing = service
		.list_files(ListFilesRequest { course_id: "econ-201".to_string() })
		.await
		.expect("Failed to list files.");

	assert_eq!(listing.files.len(), 1);
	assert_eq!(listing.files[0].file_id, "f-keep");

	// Vectors for the delisted file are gone; its exact text no longer hits.
	let results = service
		.search(SearchRequest {
			course_id: "econ-201".to_string(),
			query: "Demand curves slope downward.".to_string(),
			limit: None,
		})
		.await
		.expect("Failed to search.");

	assert!(results.items.iter().all(|item| item.file_id == "f-keep"));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
