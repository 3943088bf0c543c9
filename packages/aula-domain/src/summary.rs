use serde::{Deserialize, Serialize};

/// Where in the per-file pipeline a failure happened. Persisted with the
/// ledger row and echoed in run summaries so an instructor can tell a broken
/// upload from a flaky provider.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileErrorKind {
	Extraction,
	Download,
	Provider,
	Input,
	Store,
	Internal,
}
impl FileErrorKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Extraction => "extraction",
			Self::Download => "download",
			Self::Provider => "provider",
			Self::Input => "input",
			Self::Store => "store",
			Self::Internal => "internal",
		}
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FileFailure {
	pub file_id: String,
	pub file_name: String,
	pub kind: FileErrorKind,
	pub message: String,
}

/// Outcome of one sync run. Failures are per-file; a summary with failures is
/// still a finished run.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RunSummary {
	pub added: u32,
	pub updated: u32,
	pub removed: u32,
	pub unchanged: u32,
	pub failed: u32,
	pub elapsed_ms: u64,
	pub failures: Vec<FileFailure>,
}
impl RunSummary {
	pub fn record_failure(&mut self, failure: FileFailure) {
		self.failed += 1;
		self.failures.push(failure);
	}

	pub fn touched(&self) -> u32 {
		self.added + self.updated + self.removed
	}
}
