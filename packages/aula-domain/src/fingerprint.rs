use time::OffsetDateTime;

/// Fingerprints carry their scheme as a prefix so a stored value and an
/// observed value from a different scheme never compare equal. Any mismatch
/// re-processes the file.
pub const TIMESTAMP_SCHEME: &str = "mtime";
pub const CONTENT_SCHEME: &str = "blake3";

pub fn timestamp_fingerprint(modified_at: OffsetDateTime) -> String {
	format!("{TIMESTAMP_SCHEME}:{}", modified_at.unix_timestamp())
}

pub fn content_fingerprint(bytes: &[u8]) -> String {
	format!("{CONTENT_SCHEME}:{}", blake3::hash(bytes).to_hex())
}

pub fn is_content_scheme(fingerprint: &str) -> bool {
	fingerprint.starts_with(&format!("{CONTENT_SCHEME}:"))
}
