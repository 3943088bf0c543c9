//! Asynchronous delegation surface. A sync request only enqueues a run and
//! hands back its id; a worker picks the run up later and the caller polls
//! [`SyncService::task_status`] with the handle.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use aula_domain::{RunStatus, RunSummary};
use aula_storage::runs;

use crate::{Error, Result, SyncService};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncRequest {
	pub course_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncAccepted {
	pub run_id: Uuid,
	pub course_id: String,
	pub status: RunStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskStatusRequest {
	pub run_id: Uuid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskStatusResponse {
	pub run_id: Uuid,
	pub course_id: String,
	pub status: RunStatus,
	#[serde(with = "time::serde::rfc3339")]
	pub requested_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339::option")]
	pub started_at: Option<OffsetDateTime>,
	#[serde(with = "time::serde::rfc3339::option")]
	pub finished_at: Option<OffsetDateTime>,
	pub summary: Option<RunSummary>,
	pub last_error: Option<String>,
}

impl SyncService {
	/// Enqueues a sync run for a course. At most one run per course may be
	/// queued or running; a second request is refused with `Error::Conflict`
	/// and the course keeps its original handle.
	pub async fn request_sync(&self, req: SyncRequest) -> Result<SyncAccepted> {
		let now = OffsetDateTime::now_utc();
		let course_id = req.course_id.trim();

		if course_id.is_empty() {
			return Err(Error::InvalidRequest { message: "course_id is required.".to_string() });
		}

		let run_id = Uuid::new_v4();

		if let Err(err) = runs::insert_queued(&self.db, run_id, course_id, now).await {
			// The refusal names the live run so a caller can recover a lost
			// handle. If the live run settled in the meantime, the original
			// error stands.
			if matches!(err, aula_storage::Error::Conflict(_))
				&& let Some(live) = runs::find_live_for_course(&self.db, course_id).await?
			{
				return Err(Error::Conflict {
					message: format!(
						"A sync is already running for course {course_id} (run {}).",
						live.run_id
					),
				});
			}

			return Err(err.into());
		}

		tracing::info!(run_id = %run_id, course_id = %course_id, "Queued sync run.");

		Ok(SyncAccepted {
			run_id,
			course_id: course_id.to_string(),
			status: RunStatus::Queued,
		})
	}

	pub async fn task_status(&self, req: TaskStatusRequest) -> Result<TaskStatusResponse> {
		let run = runs::fetch_run(&self.db, req.run_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: format!("Run {} not found.", req.run_id) })?;
		let status = RunStatus::parse(&run.status).ok_or_else(|| Error::Storage {
			message: format!("Run {} has an unreadable status.", run.run_id),
		})?;
		let summary = match run.summary {
			Some(value) => Some(serde_json::from_value::<RunSummary>(value).map_err(|err| {
				Error::Storage { message: format!("Run summary is unreadable: {err}.") }
			})?),
			None => None,
		};

		Ok(TaskStatusResponse {
			run_id: run.run_id,
			course_id: run.course_id,
			status,
			requested_at: run.requested_at,
			started_at: run.started_at,
			finished_at: run.finished_at,
			summary,
			last_error: run.last_error,
		})
	}
}
