pub mod fingerprint;
pub mod plan;
pub mod source;
pub mod status;
pub mod summary;

pub use plan::{
	LedgerView, PlanContext, PlannedAction, ProcessReason, SkipReason, SyncPlan, build_sync_plan,
};
pub use source::SourceFile;
pub use status::{FileStatus, RunStatus};
pub use summary::{FileErrorKind, FileFailure, RunSummary};
