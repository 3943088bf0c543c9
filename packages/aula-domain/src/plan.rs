use std::collections::HashMap;

use time::{Duration, OffsetDateTime};

use crate::{fingerprint, source::SourceFile, status::FileStatus};

/// Projection of one ledger row, just enough to reconcile against a listing.
#[derive(Clone, Debug)]
pub struct LedgerView {
	pub file_id: String,
	pub fingerprint: String,
	pub status: FileStatus,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessReason {
	Added,
	Changed,
	Retry,
	StaleTakeover,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SkipReason {
	Unchanged,
	InFlight,
}

#[derive(Debug)]
pub enum PlannedAction {
	Process { file: SourceFile, reason: ProcessReason },
	/// The listing carried no timestamp and the stored fingerprint is
	/// content-based. The caller downloads the bytes, hashes them, and only
	/// processes on mismatch.
	VerifyContent { file: SourceFile },
	Skip { file_id: String, reason: SkipReason },
}

#[derive(Debug)]
pub struct SyncPlan {
	pub actions: Vec<PlannedAction>,
	/// File ids present in the ledger but absent from the listing. Chunks are
	/// purged before the row is deleted.
	pub removals: Vec<String>,
}

#[derive(Clone, Copy, Debug)]
pub struct PlanContext {
	pub now: OffsetDateTime,
	/// A `processing` row older than this is treated as abandoned.
	pub stale_after: Duration,
}

/// Classifies every listed file against the ledger. Pure; the caller owns all
/// I/O. Re-running over an unchanged corpus yields only `Skip` actions and no
/// removals.
pub fn build_sync_plan(
	listing: &[SourceFile],
	ledger: &[LedgerView],
	ctx: &PlanContext,
) -> SyncPlan {
	let by_file_id: HashMap<&str, &LedgerView> =
		ledger.iter().map(|entry| (entry.file_id.as_str(), entry)).collect();
	let mut actions = Vec::with_capacity(listing.len());

	for file in listing {
		actions.push(classify(file, by_file_id.get(file.id.as_str()).copied(), ctx));
	}

	let listed: HashMap<&str, ()> = listing.iter().map(|file| (file.id.as_str(), ())).collect();
	let removals = ledger
		.iter()
		.filter(|entry| !listed.contains_key(entry.file_id.as_str()))
		.map(|entry| entry.file_id.clone())
		.collect();

	SyncPlan { actions, removals }
}

fn classify(file: &SourceFile, entry: Option<&LedgerView>, ctx: &PlanContext) -> PlannedAction {
	let Some(entry) = entry else {
		return PlannedAction::Process { file: file.clone(), reason: ProcessReason::Added };
	};

	if entry.status == FileStatus::Processing {
		return if ctx.now - entry.updated_at < ctx.stale_after {
			PlannedAction::Skip { file_id: entry.file_id.clone(), reason: SkipReason::InFlight }
		} else {
			PlannedAction::Process { file: file.clone(), reason: ProcessReason::StaleTakeover }
		};
	}
	// A row that never completed is redone regardless of fingerprint.
	if matches!(entry.status, FileStatus::Pending | FileStatus::Error) {
		return PlannedAction::Process { file: file.clone(), reason: ProcessReason::Retry };
	}

	match file.modified_at {
		Some(modified_at) =>
			if fingerprint::timestamp_fingerprint(modified_at) == entry.fingerprint {
				PlannedAction::Skip { file_id: entry.file_id.clone(), reason: SkipReason::Unchanged }
			} else {
				PlannedAction::Process { file: file.clone(), reason: ProcessReason::Changed }
			},
		None =>
			if fingerprint::is_content_scheme(&entry.fingerprint) {
				PlannedAction::VerifyContent { file: file.clone() }
			} else {
				// The scheme changed under us. Ties resolve toward redoing work.
				PlannedAction::Process { file: file.clone(), reason: ProcessReason::Changed }
			},
	}
}
