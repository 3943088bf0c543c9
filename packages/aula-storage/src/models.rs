use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// One row per (course, source file). The `status` column holds
/// `aula_domain::FileStatus` values; it stays a plain string here so this
/// crate knows nothing about domain semantics.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct LedgerEntry {
	pub course_id: String,
	pub file_id: String,
	pub file_name: String,
	pub fingerprint: String,
	pub status: String,
	pub chunk_count: i32,
	pub last_error: Option<String>,
	pub processed_at: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct SyncRun {
	pub run_id: Uuid,
	pub course_id: String,
	pub status: String,
	pub requested_at: OffsetDateTime,
	pub started_at: Option<OffsetDateTime>,
	pub heartbeat_at: Option<OffsetDateTime>,
	pub finished_at: Option<OffsetDateTime>,
	pub summary: Option<Value>,
	pub last_error: Option<String>,
}
