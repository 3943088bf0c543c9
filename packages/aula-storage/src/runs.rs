//! Sync run records. One live run per course is enforced by the partial
//! unique index `sync_runs_live_course`, which doubles as the course-level
//! run lock.

use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result, db::Db, models::SyncRun};

pub async fn insert_queued(
	db: &Db,
	run_id: Uuid,
	course_id: &str,
	now: OffsetDateTime,
) -> Result<()> {
	let result = sqlx::query(
		"\
INSERT INTO sync_runs (run_id, course_id, status, requested_at)
VALUES ($1, $2, 'queued', $3)",
	)
	.bind(run_id)
	.bind(course_id)
	.bind(now)
	.execute(&db.pool)
	.await;

	match result {
		Ok(_) => Ok(()),
		Err(sqlx::Error::Database(db_err))
			if db_err.constraint() == Some("sync_runs_live_course") =>
			Err(Error::Conflict(format!("A sync is already running for course {course_id}."))),
		Err(err) => Err(err.into()),
	}
}

pub async fn fetch_run(db: &Db, run_id: Uuid) -> Result<Option<SyncRun>> {
	let run = sqlx::query_as::<_, SyncRun>(
		"\
SELECT
\trun_id,
\tcourse_id,
\tstatus,
\trequested_at,
\tstarted_at,
\theartbeat_at,
\tfinished_at,
\tsummary,
\tlast_error
FROM sync_runs
WHERE run_id = $1",
	)
	.bind(run_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(run)
}

pub async fn find_live_for_course(db: &Db, course_id: &str) -> Result<Option<SyncRun>> {
	let run = sqlx::query_as::<_, SyncRun>(
		"\
SELECT
\trun_id,
\tcourse_id,
\tstatus,
\trequested_at,
\tstarted_at,
\theartbeat_at,
\tfinished_at,
\tsummary,
\tlast_error
FROM sync_runs
WHERE course_id = $1 AND status IN ('queued', 'running')
LIMIT 1",
	)
	.bind(course_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(run)
}

/// Claims the oldest queued run and flips it to `running` in one
/// transaction. Concurrent workers skip each other via SKIP LOCKED.
pub async fn claim_next(db: &Db, now: OffsetDateTime) -> Result<Option<SyncRun>> {
	let mut tx = db.pool.begin().await?;
	let row = sqlx::query_as::<_, SyncRun>(
		"\
SELECT
\trun_id,
\tcourse_id,
\tstatus,
\trequested_at,
\tstarted_at,
\theartbeat_at,
\tfinished_at,
\tsummary,
\tlast_error
FROM sync_runs
WHERE status = 'queued'
ORDER BY requested_at ASC
LIMIT 1
FOR UPDATE SKIP LOCKED",
	)
	.fetch_optional(&mut *tx)
	.await?;
	let run = if let Some(mut run) = row {
		sqlx::query(
			"\
UPDATE sync_runs
SET status = 'running', started_at = $1, heartbeat_at = $1
WHERE run_id = $2",
		)
		.bind(now)
		.bind(run.run_id)
		.execute(&mut *tx)
		.await?;

		run.status = "running".to_string();
		run.started_at = Some(now);
		run.heartbeat_at = Some(now);

		Some(run)
	} else {
		None
	};

	tx.commit().await?;

	Ok(run)
}

pub async fn heartbeat(db: &Db, run_id: Uuid, now: OffsetDateTime) -> Result<()> {
	sqlx::query("UPDATE sync_runs SET heartbeat_at = $1 WHERE run_id = $2")
		.bind(now)
		.bind(run_id)
		.execute(&db.pool)
		.await?;

	Ok(())
}

/// Puts `running` runs whose heartbeat went silent back in the queue. The
/// row keeps its slot in the live-course index, so no second run can sneak
/// in while this happens.
pub async fn requeue_stale(db: &Db, now: OffsetDateTime, stale_after_seconds: i64) -> Result<u64> {
	let threshold = now - time::Duration::seconds(stale_after_seconds);
	let result = sqlx::query(
		"\
UPDATE sync_runs
SET status = 'queued', started_at = NULL, heartbeat_at = NULL
WHERE status = 'running' AND heartbeat_at < $1",
	)
	.bind(threshold)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected())
}

pub async fn complete(
	db: &Db,
	run_id: Uuid,
	summary: &Value,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
UPDATE sync_runs
SET status = 'completed', finished_at = $1, heartbeat_at = $1, summary = $2
WHERE run_id = $3",
	)
	.bind(now)
	.bind(summary)
	.bind(run_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn fail(db: &Db, run_id: Uuid, error_text: &str, now: OffsetDateTime) -> Result<()> {
	sqlx::query(
		"\
UPDATE sync_runs
SET status = 'failed', finished_at = $1, last_error = $2
WHERE run_id = $3",
	)
	.bind(now)
	.bind(error_text)
	.bind(run_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}
