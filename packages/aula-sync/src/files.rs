use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use aula_domain::FileStatus;
use aula_storage::ledger;

use crate::{Error, Result, SyncService};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListFilesRequest {
	pub course_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileEntry {
	pub file_id: String,
	pub file_name: String,
	pub status: FileStatus,
	pub fingerprint: String,
	pub chunk_count: i32,
	pub last_error: Option<String>,
	#[serde(with = "time::serde::rfc3339::option")]
	pub processed_at: Option<OffsetDateTime>,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListFilesResponse {
	pub course_id: String,
	pub files: Vec<FileEntry>,
}

impl SyncService {
	/// Ledger view of one course, ordered by file name. This is the state the
	/// engine believes, not a live listing from the platform.
	pub async fn list_files(&self, req: ListFilesRequest) -> Result<ListFilesResponse> {
		let course_id = req.course_id.trim();

		if course_id.is_empty() {
			return Err(Error::InvalidRequest { message: "course_id is required.".to_string() });
		}

		let entries = ledger::list_entries(&self.db, course_id).await?;
		let files = entries
			.into_iter()
			.map(|entry| FileEntry {
				file_id: entry.file_id,
				file_name: entry.file_name,
				// Unknown status text is surfaced as `error` rather than
				// failing the whole listing.
				status: FileStatus::parse(&entry.status).unwrap_or(FileStatus::Error),
				fingerprint: entry.fingerprint,
				chunk_count: entry.chunk_count,
				last_error: entry.last_error,
				processed_at: entry.processed_at,
				updated_at: entry.updated_at,
			})
			.collect();

		Ok(ListFilesResponse { course_id: course_id.to_string(), files })
	}
}
