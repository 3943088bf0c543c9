//! Course synchronization service. One [`SyncService`] owns the config, the
//! ledger database, and the vector store; operations live in their own
//! modules and are exposed as methods.
//!
//! Network providers sit behind traits so tests can swap the campus platform
//! and the embedding backend for in-process stubs.

pub mod bridge;
pub mod files;
pub mod run;
pub mod search;

mod error;

use std::{future::Future, pin::Pin, sync::Arc};

pub use bridge::{SyncAccepted, SyncRequest, TaskStatusRequest, TaskStatusResponse};
pub use error::{Error, Result};
pub use files::{FileEntry, ListFilesRequest, ListFilesResponse};
pub use run::RunOutcome;
pub use search::{SearchItem, SearchRequest, SearchResponse};

use aula_config::{Campus, Config, EmbeddingProviderConfig};
use aula_domain::SourceFile;
use aula_providers::{campus, embedding};
use aula_storage::{db::Db, qdrant::QdrantStore};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, aula_providers::Result<Vec<Vec<f32>>>>;
}

/// Listing and download against the campus platform. Listing is always
/// re-fetched in full; download carries its own timeout because course files
/// are much larger than listing pages.
pub trait CourseFileSource
where
	Self: Send + Sync,
{
	fn list_files<'a>(
		&'a self,
		cfg: &'a Campus,
		course_id: &'a str,
	) -> BoxFuture<'a, aula_providers::Result<Vec<SourceFile>>>;

	fn download<'a>(
		&'a self,
		cfg: &'a Campus,
		file: &'a SourceFile,
		timeout_ms: u64,
	) -> BoxFuture<'a, aula_providers::Result<Vec<u8>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub source: Arc<dyn CourseFileSource>,
}

pub struct SyncService {
	pub cfg: Config,
	pub db: Db,
	pub qdrant: QdrantStore,
	pub providers: Providers,
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, aula_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl CourseFileSource for DefaultProviders {
	fn list_files<'a>(
		&'a self,
		cfg: &'a Campus,
		course_id: &'a str,
	) -> BoxFuture<'a, aula_providers::Result<Vec<SourceFile>>> {
		Box::pin(campus::list_course_files(cfg, course_id))
	}

	fn download<'a>(
		&'a self,
		cfg: &'a Campus,
		file: &'a SourceFile,
		timeout_ms: u64,
	) -> BoxFuture<'a, aula_providers::Result<Vec<u8>>> {
		Box::pin(campus::download(cfg, file, timeout_ms))
	}
}

impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, source: Arc<dyn CourseFileSource>) -> Self {
		Self { embedding, source }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), source: provider }
	}
}

impl SyncService {
	pub fn new(cfg: Config, db: Db, qdrant: QdrantStore) -> Self {
		Self { cfg, db, qdrant, providers: Providers::default() }
	}

	pub fn with_providers(cfg: Config, db: Db, qdrant: QdrantStore, providers: Providers) -> Self {
		Self { cfg, db, qdrant, providers }
	}
}
