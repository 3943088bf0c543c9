use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub campus: Campus,
	pub chunking: Chunking,
	pub sync: SyncPolicy,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	/// Per-course collections are named "<prefix>_<course slug>".
	pub collection_prefix: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

/// Connection settings for the learning platform that owns the course files.
#[derive(Debug, Deserialize, Clone)]
pub struct Campus {
	pub api_base: String,
	pub api_token: String,
	pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Chunking {
	pub max_chars: u32,
	pub overlap_chars: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncPolicy {
	/// Upper bound on files processed concurrently within one run.
	pub max_concurrent_files: u32,
	/// How many chunks go to the embedding provider per request.
	pub embed_batch_size: u32,
	/// In-run retries for transient embedding failures.
	pub max_retries: u32,
	/// Age after which a `processing` marker from a dead run may be taken over.
	pub stale_after_seconds: u64,
	/// Falls back to campus.timeout_ms when unset.
	pub download_timeout_ms: Option<u64>,
}
