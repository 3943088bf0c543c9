pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Cleanup failures are reported, never recovered from, so one string-shaped
/// error covers the whole crate.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct Error(pub String);
