use std::sync::Arc;

use aula_sync::{Providers, SearchRequest, SyncRequest};

use super::{StubCampus, StubEmbedding, VECTOR_DIM};

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set AULA_PG_DSN and AULA_QDRANT_URL to run."]
async fn search_stays_inside_the_course_collection() {
	let Some(test_db) = super::test_db().await else {
		eprintln!(
			"Skipping search_stays_inside_the_course_collection; set AULA_PG_DSN to run this test."
		);

		return;
	};
	let Some(qdrant_url) = super::test_qdrant_url() else {
		eprintln!(
			"Skipping search_stays_inside_the_course_collection; set AULA_QDRANT_URL to run this test."
		);

		return;
	};
	let campus = StubCampus::new();

	campus.set_course(
		"macro-201",
		vec![super::text_file("f-macro", "inflation.txt", 1_700_000_000, "Inflation raises prices.")],
	);
	campus.set_course(
		"bio-110",
		vec![super::text_file("f-bio", "cells.txt", 1_700_000_000, "Cells divide by mitosis.")],
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

	super::track_course(&test_db, &cfg, "macro-201");
	super::track_course(&test_db, &cfg, "bio-110");

	let service = super::build_service(cfg, providers).await;

	for course_id in ["macro-201", "bio-110"] {
		service
			.request_sync(SyncRequest { course_id: course_id.to_string() })
			.await
			.expect("Failed to request sync.");
		super::drive_one_run(&service).await;
	}

	let macro_hits = service
		.search(SearchRequest {
			course_id: "macro-201".to_string(),
			query: "Inflation raises prices.".to_string(),
			limit: None,
		})
		.await
		.expect("Failed to search macro-201.");

	assert!(!macro_hits.items.is_empty());
	assert!(macro_hits.items.iter().all(|item| item.file_id == "f-macro"));

	// Asking one course about the other's content never crosses collections.
	let cross_hits = service
		.search(SearchRequest {
			course_id: "macro-201".to_string(),
			query: "Cells divide by mitosis.".to_string(),
			limit: None,
		})
		.await
		.expect("Failed to cross-search macro-201.");

	assert!(cross_hits.items.iter().all(|item| item.file_id == "f-macro"));

	let bio_hits = service
		.search(SearchRequest {
			course_id: "bio-110".to_string(),
			query: "Cells divide by mitosis.".to_string(),
			limit: None,
		})
		.await
		.expect("Failed to search bio-110.");

	assert!(!bio_hits.items.is_empty());
	assert!(bio_hits.items.iter().all(|item| item.file_id == "f-bio"));

	// A course that never synced has no collection to search.
	let err = service
		.search(SearchRequest {
			course_id: "never-synced".to_string(),
			query: "anything".to_string(),
			limit: None,
		})
		.await
		.expect_err("Expected not found.");

	assert!(matches!(err, aula_sync::Error::NotFound { .. }));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set AULA_PG_DSN and AULA_QDRANT_URL to run."]
async fn search_rejects_bad_requests() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping search_rejects_bad_requests; set AULA_PG_DSN to run this test.");

		return;
	};
	let Some(qdrant_url) = super::test_qdrant_url() else {
		eprintln!("Skipping search_rejects_bad_requests; set AULA_QDRANT_URL to run this test.");

		return;
	};
	let providers = Providers::new(
		Arc::new(StubEmbedding { vector_dim: VECTOR_DIM }),
		Arc::new(StubCampus::new()),
	);
	let cfg = super::test_config(
		test_db.dsn().to_string(),
		qdrant_url,
		VECTOR_DIM,
		test_db.collection_prefix(),
	);
	let service = super::build_service(cfg, providers).await;
	let blank_query = service
		.search(SearchRequest {
			course_id: "macro-201".to_string(),
			query: "   ".to_string(),
			limit: None,
		})
		.await
		.expect_err("Expected invalid request for blank query.");

	assert!(matches!(blank_query, aula_sync::Error::InvalidRequest { .. }));

	let zero_limit = service
		.search(SearchRequest {
			course_id: "macro-201".to_string(),
			query: "prices".to_string(),
			limit: Some(0),
		})
		.await
		.expect_err("Expected invalid request for zero limit.");

	assert!(matches!(zero_limit, aula_sync::Error::InvalidRequest { .. }));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
