/// The full DDL, applied statement by statement under an advisory lock.
/// Statements must stay free of embedded semicolons so the splitter in
/// `db::ensure_schema` can walk them.
pub const SCHEMA_SQL: &str = "\
CREATE TABLE IF NOT EXISTS file_ledger (
	course_id    TEXT NOT NULL,
	file_id      TEXT NOT NULL,
	file_name    TEXT NOT NULL,
	fingerprint  TEXT NOT NULL,
	status       TEXT NOT NULL DEFAULT 'pending'
		CHECK (status IN ('pending', 'processing', 'completed', 'error')),
	chunk_count  INTEGER NOT NULL DEFAULT 0,
	last_error   TEXT,
	processed_at TIMESTAMPTZ,
	created_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
	updated_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
	PRIMARY KEY (course_id, file_id)
);

CREATE INDEX IF NOT EXISTS file_ledger_course_status
	ON file_ledger (course_id, status);

CREATE TABLE IF NOT EXISTS sync_runs (
	run_id       UUID PRIMARY KEY,
	course_id    TEXT NOT NULL,
	status       TEXT NOT NULL DEFAULT 'queued'
		CHECK (status IN ('queued', 'running', 'completed', 'failed')),
	requested_at TIMESTAMPTZ NOT NULL DEFAULT now(),
	started_at   TIMESTAMPTZ,
	heartbeat_at TIMESTAMPTZ,
	finished_at  TIMESTAMPTZ,
	summary      JSONB,
	last_error   TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS sync_runs_live_course
	ON sync_runs (course_id)
	WHERE status IN ('queued', 'running');

CREATE INDEX IF NOT EXISTS sync_runs_claim
	ON sync_runs (status, requested_at);
";
