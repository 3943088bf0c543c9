mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Campus, Chunking, Config, EmbeddingProviderConfig, Postgres, Providers, Qdrant, Service,
	Storage, SyncPolicy,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.qdrant.url.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.url must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection_prefix.is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection_prefix must be non-empty.".to_string(),
		});
	}
	if !cfg
		.storage
		.qdrant
		.collection_prefix
		.chars()
		.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
	{
		return Err(Error::Validation {
			message: "storage.qdrant.collection_prefix must contain only ASCII letters, digits, \
			          hyphens, or underscores."
				.to_string(),
		});
	}
	if cfg.storage.qdrant.vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.qdrant.vector_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.embedding.api_key must be non-empty.".to_string(),
		});
	}
	if cfg.campus.api_base.trim().is_empty() {
		return Err(Error::Validation {
			message: "campus.api_base must be non-empty.".to_string(),
		});
	}
	if cfg.campus.api_token.trim().is_empty() {
		return Err(Error::Validation {
			message: "campus.api_token must be non-empty.".to_string(),
		});
	}
	if cfg.campus.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "campus.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.chunking.max_chars == 0 {
		return Err(Error::Validation {
			message: "chunking.max_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.chunking.overlap_chars >= cfg.chunking.max_chars {
		return Err(Error::Validation {
			message: "chunking.overlap_chars must be less than chunking.max_chars.".to_string(),
		});
	}
	if cfg.sync.max_concurrent_files == 0 {
		return Err(Error::Validation {
			message: "sync.max_concurrent_files must be greater than zero.".to_string(),
		});
	}
	if cfg.sync.embed_batch_size == 0 {
		return Err(Error::Validation {
			message: "sync.embed_batch_size must be greater than zero.".to_string(),
		});
	}
	if cfg.sync.stale_after_seconds == 0 {
		return Err(Error::Validation {
			message: "sync.stale_after_seconds must be greater than zero.".to_string(),
		});
	}

	if let Some(timeout) = cfg.sync.download_timeout_ms
		&& timeout == 0
	{
		return Err(Error::Validation {
			message: "sync.download_timeout_ms must be greater than zero when set.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	// Collection names are "<prefix>_<slug>"; a trailing separator in the
	// prefix would double up.
	let prefix =
		cfg.storage.qdrant.collection_prefix.trim().trim_end_matches(['-', '_']).to_string();

	cfg.storage.qdrant.collection_prefix = prefix;

	if cfg.sync.download_timeout_ms.is_none() {
		cfg.sync.download_timeout_ms = Some(cfg.campus.timeout_ms);
	}
}
