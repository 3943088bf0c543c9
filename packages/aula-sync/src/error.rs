pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Qdrant error: {message}")]
	Qdrant { message: String },
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<aula_storage::Error> for Error {
	fn from(err: aula_storage::Error) -> Self {
		match err {
			aula_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			aula_storage::Error::NotFound(message) => Self::NotFound { message },
			aula_storage::Error::Conflict(message) => Self::Conflict { message },
			aula_storage::Error::Qdrant(inner) => Self::Qdrant { message: inner.to_string() },
		}
	}
}

impl From<aula_providers::Error> for Error {
	fn from(err: aula_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
