use time::OffsetDateTime;

/// One file as reported by the campus platform for a course folder.
///
/// References are ephemeral. Every sync re-fetches the listing and nothing
/// here is persisted beyond the derived ledger fingerprint.
#[derive(Clone, Debug)]
pub struct SourceFile {
	/// Platform-assigned file id, opaque to the engine.
	pub id: String,
	pub name: String,
	pub mime_type: Option<String>,
	/// Last-modified time on the platform clock, when the listing carries one.
	pub modified_at: Option<OffsetDateTime>,
	pub download_url: String,
}
