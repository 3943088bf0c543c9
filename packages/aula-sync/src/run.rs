//! Run execution. A claimed run reconciles one course: fetch the listing,
//! diff it against the ledger, then fan the resulting work out over a bounded
//! set of per-file tasks. A file failure marks that row `error` and lands in
//! the summary; the run itself keeps going.

use std::{
	collections::HashMap,
	sync::Arc,
	time::{Duration as StdDuration, Instant},
};

use regex::Regex;
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tokio::{
	task::{Id, JoinError, JoinHandle, JoinSet},
	time as tokio_time,
};
use uuid::Uuid;

use aula_chunking::ChunkingConfig;
use aula_config::{Campus, EmbeddingProviderConfig};
use aula_domain::{
	FileErrorKind, FileFailure, FileStatus, LedgerView, PlanContext, PlannedAction, ProcessReason,
	RunStatus, RunSummary, SkipReason, SourceFile, build_sync_plan, fingerprint,
};
use aula_storage::{
	db::Db,
	ledger,
	models::SyncRun,
	qdrant::{ChunkPoint, QdrantStore},
	runs,
};

use crate::{Error, Providers, Result, SyncService};

const HEARTBEAT_INTERVAL_MS: u64 = 5_000;
const BASE_BACKOFF_MS: u64 = 500;
const MAX_BACKOFF_MS: u64 = 30_000;
const MAX_STORED_ERROR_CHARS: usize = 1_024;

/// What happened to the run a worker just drove to completion.
#[derive(Clone, Debug, Serialize)]
pub struct RunOutcome {
	pub run_id: Uuid,
	pub course_id: String,
	pub status: RunStatus,
	pub summary: Option<RunSummary>,
	pub error: Option<String>,
}

/// Everything a per-file task needs, cloned out of the service once per run
/// so tasks never borrow it.
struct RunContext {
	db: Db,
	qdrant: QdrantStore,
	campus: Campus,
	embedding: EmbeddingProviderConfig,
	chunking: ChunkingConfig,
	providers: Providers,
	course_id: String,
	vector_dim: u32,
	embed_batch_size: usize,
	max_retries: u32,
	download_timeout_ms: u64,
}

enum FileJob {
	Process { file: SourceFile, reason: ProcessReason },
	/// The listing carried no timestamp; download and hash before deciding.
	Verify { file: SourceFile, expected: String },
}
impl FileJob {
	fn meta(&self) -> FileMeta {
		match self {
			Self::Process { file, reason } =>
				FileMeta { file_id: file.id.clone(), file_name: file.name.clone(), reason: *reason },
			Self::Verify { file, .. } => FileMeta {
				file_id: file.id.clone(),
				file_name: file.name.clone(),
				reason: ProcessReason::Changed,
			},
		}
	}
}

struct FileMeta {
	file_id: String,
	file_name: String,
	reason: ProcessReason,
}

enum FileOutcome {
	Completed { chunk_count: i32 },
	Unchanged,
	Failed { kind: FileErrorKind, message: String },
}

impl SyncService {
	/// Claims the oldest queued run and drives it to a terminal state. Returns
	/// `None` when the queue is empty. Run-level failures (an unreachable
	/// listing, a dead database) fail the run; per-file failures do not.
	pub async fn process_next_run(&self) -> Result<Option<RunOutcome>> {
		let now = OffsetDateTime::now_utc();
		let Some(run) = runs::claim_next(&self.db, now).await? else {
			return Ok(None);
		};

		tracing::info!(run_id = %run.run_id, course_id = %run.course_id, "Claimed sync run.");

		let heartbeat = spawn_heartbeat(self.db.clone(), run.run_id);
		let result = self.execute_run(&run).await;

		heartbeat.abort();

		match result {
			Ok(summary) => {
				let summary_json = serde_json::to_value(&summary).map_err(|err| Error::Storage {
					message: format!("Failed to encode run summary: {err}."),
				})?;

				runs::complete(&self.db, run.run_id, &summary_json, OffsetDateTime::now_utc())
					.await?;
				tracing::info!(
					run_id = %run.run_id,
					course_id = %run.course_id,
					added = summary.added,
					updated = summary.updated,
					removed = summary.removed,
					unchanged = summary.unchanged,
					failed = summary.failed,
					elapsed_ms = summary.elapsed_ms,
					"Sync run completed."
				);

				Ok(Some(RunOutcome {
					run_id: run.run_id,
					course_id: run.course_id,
					status: RunStatus::Completed,
					summary: Some(summary),
					error: None,
				}))
			},
			Err(err) => {
				let error_text = sanitize_error(&err.to_string());

				runs::fail(&self.db, run.run_id, &error_text, OffsetDateTime::now_utc()).await?;
				tracing::error!(run_id = %run.run_id, course_id = %run.course_id, error = %err, "Sync run failed.");

				Ok(Some(RunOutcome {
					run_id: run.run_id,
					course_id: run.course_id,
					status: RunStatus::Failed,
					summary: None,
					error: Some(error_text),
				}))
			},
		}
	}

	/// Flips `running` runs whose heartbeat went quiet back to `queued` so
	/// another worker can take them over.
	pub async fn recover_stale_runs(&self) -> Result<u64> {
		let now = OffsetDateTime::now_utc();
		let requeued =
			runs::requeue_stale(&self.db, now, self.cfg.sync.stale_after_seconds as i64).await?;

		if requeued > 0 {
			tracing::warn!(count = requeued, "Requeued stale sync runs.");
		}

		Ok(requeued)
	}

	async fn execute_run(&self, run: &SyncRun) -> Result<RunSummary> {
		let started = Instant::now();
		let now = OffsetDateTime::now_utc();
		let course_id = run.course_id.as_str();
		let listing = self.providers.source.list_files(&self.cfg.campus, course_id).await?;
		let entries = ledger::list_entries(&self.db, course_id).await?;
		let views: Vec<LedgerView> = entries
			.iter()
			.map(|entry| LedgerView {
				file_id: entry.file_id.clone(),
				fingerprint: entry.fingerprint.clone(),
				// Unreadable status text forces a re-process instead of
				// wedging the row forever.
				status: FileStatus::parse(&entry.status).unwrap_or(FileStatus::Error),
				updated_at: entry.updated_at,
			})
			.collect();
		let ctx = PlanContext {
			now,
			stale_after: Duration::seconds(self.cfg.sync.stale_after_seconds as i64),
		};
		let plan = build_sync_plan(&listing, &views, &ctx);
		let fingerprints: HashMap<&str, &str> = views
			.iter()
			.map(|view| (view.file_id.as_str(), view.fingerprint.as_str()))
			.collect();
		let mut summary = RunSummary::default();
		let mut jobs = Vec::new();

		for action in plan.actions {
			match action {
				PlannedAction::Process { file, reason } =>
					jobs.push(FileJob::Process { file, reason }),
				PlannedAction::VerifyContent { file } => {
					let expected =
						fingerprints.get(file.id.as_str()).map(|f| (*f).to_string()).unwrap_or_default();

					jobs.push(FileJob::Verify { file, expected });
				},
				PlannedAction::Skip { reason: SkipReason::Unchanged, .. } => summary.unchanged += 1,
				PlannedAction::Skip { file_id, reason: SkipReason::InFlight } => {
					tracing::info!(course_id = %course_id, file_id = %file_id, "File is in flight elsewhere. Leaving it alone.");
					summary.unchanged += 1;
				},
			}
		}

		tracing::info!(
			run_id = %run.run_id,
			course_id = %course_id,
			listed = listing.len(),
			to_process = jobs.len(),
			removals = plan.removals.len(),
			"Planned sync run."
		);

		let run_ctx = Arc::new(RunContext {
			db: self.db.clone(),
			qdrant: self.qdrant.clone(),
			campus: self.cfg.campus.clone(),
			embedding: self.cfg.providers.embedding.clone(),
			chunking: ChunkingConfig {
				max_chars: self.cfg.chunking.max_chars,
				overlap_chars: self.cfg.chunking.overlap_chars,
			},
			providers: self.providers.clone(),
			course_id: course_id.to_string(),
			vector_dim: self.cfg.storage.qdrant.vector_dim,
			embed_batch_size: self.cfg.sync.embed_batch_size as usize,
			max_retries: self.cfg.sync.max_retries,
			download_timeout_ms: self
				.cfg
				.sync
				.download_timeout_ms
				.unwrap_or(self.cfg.campus.timeout_ms),
		});
		let limit = self.cfg.sync.max_concurrent_files.max(1) as usize;
		let mut tasks: JoinSet<FileOutcome> = JoinSet::new();
		let mut meta: HashMap<Id, FileMeta> = HashMap::new();

		for job in jobs {
			if tasks.len() >= limit
				&& let Some(joined) = tasks.join_next_with_id().await
			{
				absorb_file_result(joined, &mut meta, &mut summary);
			}

			let job_meta = job.meta();
			let handle = tasks.spawn(process_file(run_ctx.clone(), job));

			meta.insert(handle.id(), job_meta);
		}
		while let Some(joined) = tasks.join_next_with_id().await {
			absorb_file_result(joined, &mut meta, &mut summary);
		}

		// Removals run after the files so a rename (delete plus add of the
		// same content) never leaves the course without it.
		let names: HashMap<&str, &str> = entries
			.iter()
			.map(|entry| (entry.file_id.as_str(), entry.file_name.as_str()))
			.collect();

		for file_id in plan.removals {
			match remove_file(&run_ctx, &file_id).await {
				Ok(()) => {
					summary.removed += 1;
					tracing::info!(course_id = %course_id, file_id = %file_id, "Removed delisted file.");
				},
				Err(err) => {
					let message = sanitize_error(&err.to_string());

					tracing::warn!(course_id = %course_id, file_id = %file_id, error = %message, "Failed to remove delisted file.");
					summary.record_failure(FileFailure {
						file_name: names.get(file_id.as_str()).map(|n| (*n).to_string()).unwrap_or_default(),
						file_id,
						kind: FileErrorKind::Store,
						message,
					});
				},
			}
		}

		summary.elapsed_ms = started.elapsed().as_millis() as u64;

		Ok(summary)
	}
}

fn spawn_heartbeat(db: Db, run_id: Uuid) -> JoinHandle<()> {
	tokio::spawn(async move {
		let mut ticker = tokio_time::interval(StdDuration::from_millis(HEARTBEAT_INTERVAL_MS));

		loop {
			ticker.tick().await;

			if let Err(err) = runs::heartbeat(&db, run_id, OffsetDateTime::now_utc()).await {
				tracing::warn!(run_id = %run_id, error = %err, "Run heartbeat failed.");
			}
		}
	})
}

fn absorb_file_result(
	joined: Result<(Id, FileOutcome), JoinError>,
	meta: &mut HashMap<Id, FileMeta>,
	summary: &mut RunSummary,
) {
	let (task_id, outcome) = match joined {
		Ok((task_id, outcome)) => (task_id, outcome),
		Err(err) => {
			let entry = meta.remove(&err.id());
			let (file_id, file_name) = match entry {
				Some(entry) => (entry.file_id, entry.file_name),
				None => (String::new(), String::new()),
			};

			tracing::error!(error = %err, file_id = %file_id, "File task aborted.");
			summary.record_failure(FileFailure {
				file_id,
				file_name,
				kind: FileErrorKind::Internal,
				message: "File task panicked.".to_string(),
			});

			return;
		},
	};
	let Some(FileMeta { file_id, file_name, reason }) = meta.remove(&task_id) else {
		tracing::error!("File task finished without bookkeeping.");

		return;
	};

	match outcome {
		FileOutcome::Completed { chunk_count } => {
			match reason {
				ProcessReason::Added => summary.added += 1,
				_ => summary.updated += 1,
			}

			tracing::info!(file_id = %file_id, chunks = chunk_count, "File indexed.");
		},
		FileOutcome::Unchanged => summary.unchanged += 1,
		FileOutcome::Failed { kind, message } => {
			tracing::warn!(file_id = %file_id, kind = kind.as_str(), error = %message, "File failed.");
			summary.record_failure(FileFailure { file_id, file_name, kind, message });
		},
	}
}

/// The whole per-file pipeline. Never returns `Err`; every failure becomes a
/// `FileOutcome::Failed` after being written to the ledger row.
async fn process_file(ctx: Arc<RunContext>, job: FileJob) -> FileOutcome {
	let now = OffsetDateTime::now_utc();
	let (file, bytes) = match job {
		FileJob::Process { file, .. } => (file, None),
		FileJob::Verify { file, expected } => {
			let downloaded = match ctx
				.providers
				.source
				.download(&ctx.campus, &file, ctx.download_timeout_ms)
				.await
			{
				Ok(downloaded) => downloaded,
				Err(err) =>
					return fail_file(&ctx, &file, FileErrorKind::Download, &err.to_string()).await,
			};

			if fingerprint::content_fingerprint(&downloaded) == expected {
				return FileOutcome::Unchanged;
			}

			(file, Some(downloaded))
		},
	};

	// The pending marker goes in before any further I/O so every later
	// failure has a row to land on.
	let provisional = provisional_fingerprint(&file, bytes.as_deref());

	if let Err(err) =
		ledger::upsert_pending(&ctx.db, &ctx.course_id, &file.id, &file.name, &provisional, now)
			.await
	{
		return FileOutcome::Failed {
			kind: FileErrorKind::Store,
			message: sanitize_error(&err.to_string()),
		};
	}
	if let Err(err) = ledger::mark_processing(&ctx.db, &ctx.course_id, &file.id, now).await {
		return fail_file(&ctx, &file, FileErrorKind::Store, &err.to_string()).await;
	}

	let bytes = match bytes {
		Some(bytes) => bytes,
		None => match ctx
			.providers
			.source
			.download(&ctx.campus, &file, ctx.download_timeout_ms)
			.await
		{
			Ok(downloaded) => downloaded,
			Err(err) =>
				return fail_file(&ctx, &file, FileErrorKind::Download, &err.to_string()).await,
		},
	};
	let final_fingerprint = match file.modified_at {
		Some(modified_at) => fingerprint::timestamp_fingerprint(modified_at),
		None => fingerprint::content_fingerprint(&bytes),
	};
	let text = match aula_extract::extract_text(bytes, file.mime_type.as_deref()).await {
		Ok(text) => text,
		Err(err) => return fail_file(&ctx, &file, FileErrorKind::Extraction, &err.to_string()).await,
	};
	let chunks = aula_chunking::split_text(&text, &ctx.chunking);

	if chunks.is_empty() {
		return fail_file(&ctx, &file, FileErrorKind::Extraction, "Chunking produced no chunks.")
			.await;
	}

	let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
	let vectors = match embed_with_retry(&ctx, &texts).await {
		Ok(vectors) => vectors,
		Err(err) => {
			// A rejection is the input's fault and stays until the file
			// changes; everything else is the provider's.
			let kind = match &err {
				aula_providers::Error::Rejected { .. } => FileErrorKind::Input,
				_ => FileErrorKind::Provider,
			};

			return fail_file(&ctx, &file, kind, &err.to_string()).await;
		},
	};

	if vectors.len() != chunks.len() {
		let message = format!(
			"Embedding provider returned {} vectors for {} chunks.",
			vectors.len(),
			chunks.len()
		);

		return fail_file(&ctx, &file, FileErrorKind::Provider, &message).await;
	}
	for vector in &vectors {
		if vector.len() != ctx.vector_dim as usize {
			let message = format!(
				"Embedding dimension {} does not match configured vector_dim {}.",
				vector.len(),
				ctx.vector_dim
			);

			return fail_file(&ctx, &file, FileErrorKind::Provider, &message).await;
		}
	}

	let points: Vec<ChunkPoint> = chunks
		.iter()
		.zip(vectors)
		.map(|(chunk, vector)| ChunkPoint {
			chunk_id: chunk_id_for(&ctx.course_id, &file.id, chunk.chunk_index),
			file_id: file.id.clone(),
			file_name: file.name.clone(),
			chunk_index: chunk.chunk_index,
			text: chunk.text.clone(),
			vector,
		})
		.collect();
	let chunk_count = points.len() as i32;

	if let Err(err) = ctx.qdrant.replace_chunks(&ctx.course_id, &file.id, points).await {
		return fail_file(&ctx, &file, FileErrorKind::Store, &err.to_string()).await;
	}
	if let Err(err) = ledger::mark_completed(
		&ctx.db,
		&ctx.course_id,
		&file.id,
		&final_fingerprint,
		chunk_count,
		OffsetDateTime::now_utc(),
	)
	.await
	{
		return fail_file(&ctx, &file, FileErrorKind::Store, &err.to_string()).await;
	}

	FileOutcome::Completed { chunk_count }
}

async fn fail_file(
	ctx: &RunContext,
	file: &SourceFile,
	kind: FileErrorKind,
	message: &str,
) -> FileOutcome {
	let message = sanitize_error(message);
	let now = OffsetDateTime::now_utc();

	if let Err(err) = ledger::mark_error(&ctx.db, &ctx.course_id, &file.id, &message, now).await {
		tracing::error!(file_id = %file.id, error = %err, "Failed to record file error.");
	}

	FileOutcome::Failed { kind, message }
}

/// Chunk vectors go out in fixed batches; only transient provider failures
/// are retried, with exponential backoff, up to the configured budget.
async fn embed_with_retry(
	ctx: &RunContext,
	texts: &[String],
) -> aula_providers::Result<Vec<Vec<f32>>> {
	let mut vectors = Vec::with_capacity(texts.len());

	for batch in texts.chunks(ctx.embed_batch_size) {
		let mut attempt = 0_u32;
		let batch_vectors = loop {
			attempt += 1;

			match ctx.providers.embedding.embed(&ctx.embedding, batch).await {
				Ok(batch_vectors) => break batch_vectors,
				Err(err) if err.is_transient() && attempt <= ctx.max_retries => {
					tracing::warn!(error = %err, attempt, "Transient embedding failure. Backing off.");
					tokio_time::sleep(backoff_for_attempt(attempt)).await;
				},
				Err(err) => return Err(err),
			}
		};

		vectors.extend(batch_vectors);
	}

	Ok(vectors)
}

async fn remove_file(ctx: &RunContext, file_id: &str) -> Result<()> {
	// Vectors go first. A crash in between leaves the ledger row behind and
	// the next run plans the removal again.
	ctx.qdrant.delete_file_chunks(&ctx.course_id, file_id).await?;
	ledger::delete_entry(&ctx.db, &ctx.course_id, file_id).await?;

	Ok(())
}

fn provisional_fingerprint(file: &SourceFile, bytes: Option<&[u8]>) -> String {
	match (file.modified_at, bytes) {
		(Some(modified_at), _) => fingerprint::timestamp_fingerprint(modified_at),
		(None, Some(bytes)) => fingerprint::content_fingerprint(bytes),
		// Nothing downloaded yet and no timestamp. Completion writes the
		// real fingerprint.
		(None, None) => String::new(),
	}
}

/// Chunk ids are derived, not random, so re-indexing a file upserts the same
/// points instead of growing the collection.
fn chunk_id_for(course_id: &str, file_id: &str, chunk_index: i32) -> Uuid {
	let name = format!("{course_id}:{file_id}:{chunk_index}");

	Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

fn sanitize_error(text: &str) -> String {
	// Same secret shapes the provider configs carry. A pattern that fails to
	// compile is skipped rather than failing the run.
	let patterns = [
		r"(?i)\b(api[_-]?key|password|secret|token)(\s*[:=]\s*)\S+",
		r"(?i)\b(bearer)(\s+)\S+",
	];
	let mut out = text.to_string();

	for pattern in patterns {
		if let Ok(re) = Regex::new(pattern) {
			out = re.replace_all(&out, "${1}${2}[REDACTED]").into_owned();
		}
	}

	if out.chars().count() > MAX_STORED_ERROR_CHARS {
		out = out.chars().take(MAX_STORED_ERROR_CHARS).collect();
		out.push_str("...");
	}

	out
}

fn backoff_for_attempt(attempt: u32) -> StdDuration {
	let exp = attempt.max(1).saturating_sub(1).min(6);
	let base = BASE_BACKOFF_MS.saturating_mul(1 << exp);

	StdDuration::from_millis(base.min(MAX_BACKOFF_MS))
}
