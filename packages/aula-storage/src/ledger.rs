//! Row-level operations on the file ledger. Every write runs as its own
//! statement on the pool, so a returned `Ok` means the change is durable.

use time::OffsetDateTime;

use crate::{Result, db::Db, models::LedgerEntry};

pub async fn fetch_entry(
	db: &Db,
	course_id: &str,
	file_id: &str,
) -> Result<Option<LedgerEntry>> {
	let entry = sqlx::query_as::<_, LedgerEntry>(
		"\
SELECT
\tcourse_id,
\tfile_id,
\tfile_name,
\tfingerprint,
\tstatus,
\tchunk_count,
\tlast_error,
\tprocessed_at,
\tcreated_at,
\tupdated_at
FROM file_ledger
WHERE course_id = $1 AND file_id = $2",
	)
	.bind(course_id)
	.bind(file_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(entry)
}

pub async fn list_entries(db: &Db, course_id: &str) -> Result<Vec<LedgerEntry>> {
	let entries = sqlx::query_as::<_, LedgerEntry>(
		"\
SELECT
\tcourse_id,
\tfile_id,
\tfile_name,
\tfingerprint,
\tstatus,
\tchunk_count,
\tlast_error,
\tprocessed_at,
\tcreated_at,
\tupdated_at
FROM file_ledger
WHERE course_id = $1
ORDER BY file_name ASC, file_id ASC",
	)
	.bind(course_id)
	.fetch_all(&db.pool)
	.await?;

	Ok(entries)
}

/// First sight of a file, or the start of a re-process. Resets the status to
/// `pending` and clears the previous error while keeping the old chunk count
/// until a new one is known.
pub async fn upsert_pending(
	db: &Db,
	course_id: &str,
	file_id: &str,
	file_name: &str,
	fingerprint: &str,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO file_ledger (course_id, file_id, file_name, fingerprint, status, created_at, updated_at)
VALUES ($1, $2, $3, $4, 'pending', $5, $5)
ON CONFLICT (course_id, file_id) DO UPDATE
SET file_name = EXCLUDED.file_name,
\tfingerprint = EXCLUDED.fingerprint,
\tstatus = 'pending',
\tlast_error = NULL,
\tupdated_at = EXCLUDED.updated_at",
	)
	.bind(course_id)
	.bind(file_id)
	.bind(file_name)
	.bind(fingerprint)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn mark_processing(
	db: &Db,
	course_id: &str,
	file_id: &str,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
UPDATE file_ledger
SET status = 'processing', updated_at = $3
WHERE course_id = $1 AND file_id = $2",
	)
	.bind(course_id)
	.bind(file_id)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// The fingerprint is written again here because content-fingerprinted files
/// only learn their final fingerprint after download.
pub async fn mark_completed(
	db: &Db,
	course_id: &str,
	file_id: &str,
	fingerprint: &str,
	chunk_count: i32,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
UPDATE file_ledger
SET status = 'completed',
\tfingerprint = $3,
\tchunk_count = $4,
\tlast_error = NULL,
\tprocessed_at = $5,
\tupdated_at = $5
WHERE course_id = $1 AND file_id = $2",
	)
	.bind(course_id)
	.bind(file_id)
	.bind(fingerprint)
	.bind(chunk_count)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn mark_error(
	db: &Db,
	course_id: &str,
	file_id: &str,
	message: &str,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
UPDATE file_ledger
SET status = 'error', last_error = $3, updated_at = $4
WHERE course_id = $1 AND file_id = $2",
	)
	.bind(course_id)
	.bind(file_id)
	.bind(message)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn delete_entry(db: &Db, course_id: &str, file_id: &str) -> Result<()> {
	sqlx::query("DELETE FROM file_ledger WHERE course_id = $1 AND file_id = $2")
		.bind(course_id)
		.bind(file_id)
		.execute(&db.pool)
		.await?;

	Ok(())
}
