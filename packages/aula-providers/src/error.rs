use reqwest::StatusCode;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures are split by what the caller should do with them: `Transient`
/// is worth retrying, `Rejected` will keep failing until the input changes,
/// `Malformed` means the provider answered with something unusable.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Provider call failed transiently: {message}")]
	Transient { message: String },
	#[error("Provider rejected the request: {message}")]
	Rejected { message: String },
	#[error("Provider response is malformed: {message}")]
	Malformed { message: String },
}

impl Error {
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::Transient { .. })
	}

	pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
		if let Some(status) = e.status() {
			return Self::from_status(status, e.to_string());
		}
		if e.is_decode() {
			return Self::Malformed { message: e.to_string() };
		}

		// Timeouts, refused connections, DNS hiccups.
		Self::Transient { message: e.to_string() }
	}

	pub(crate) fn from_status(status: StatusCode, message: String) -> Self {
		if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
			Self::Transient { message }
		} else {
			Self::Rejected { message }
		}
	}
}
