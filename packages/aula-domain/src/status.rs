use serde::{Deserialize, Serialize};

/// Per-file processing state recorded in the ledger.
///
/// Within one run a row only moves forward: pending, then processing, then
/// completed or error. A later run may reset any non-fresh row back to
/// pending.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
	Pending,
	Processing,
	Completed,
	Error,
}
impl FileStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::Processing => "processing",
			Self::Completed => "completed",
			Self::Error => "error",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"pending" => Some(Self::Pending),
			"processing" => Some(Self::Processing),
			"completed" => Some(Self::Completed),
			"error" => Some(Self::Error),
			_ => None,
		}
	}
}

/// Lifecycle of one delegated sync run.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
	Queued,
	Running,
	Completed,
	Failed,
}
impl RunStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Queued => "queued",
			Self::Running => "running",
			Self::Completed => "completed",
			Self::Failed => "failed",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"queued" => Some(Self::Queued),
			"running" => Some(Self::Running),
			"completed" => Some(Self::Completed),
			"failed" => Some(Self::Failed),
			_ => None,
		}
	}

	/// A live run blocks new runs for the same course.
	pub fn is_live(&self) -> bool {
		matches!(self, Self::Queued | Self::Running)
	}

	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Completed | Self::Failed)
	}
}
