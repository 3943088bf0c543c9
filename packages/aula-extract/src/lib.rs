mod ooxml;
mod pdf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
	"application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const PPTX_MIME: &str =
	"application/vnd.openxmlformats-officedocument.presentationml.presentation";

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Unsupported document type: {mime}.")]
	Unsupported { mime: String },
	#[error("Extraction failed: {message}")]
	Extraction { message: String },
	#[error("Document contains no extractable text.")]
	NoText,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Kind {
	Pdf,
	Docx,
	Pptx,
	Text,
}

/// Extracts plain text from a document held fully in memory.
///
/// The declared MIME type drives dispatch; when it is missing or not
/// recognized the magic bytes decide. A document that yields only whitespace
/// is an error, never an empty string, so callers always record something
/// actionable in the ledger.
pub async fn extract_text(bytes: Vec<u8>, mime_type: Option<&str>) -> Result<String> {
	let kind = detect_kind(&bytes, mime_type)?;
	let raw = match kind {
		Kind::Pdf => pdf::extract(bytes).await?,
		Kind::Docx => ooxml::extract_docx(&bytes)?,
		Kind::Pptx => ooxml::extract_pptx(&bytes)?,
		Kind::Text => String::from_utf8_lossy(&bytes).into_owned(),
	};
	let normalized = normalize_whitespace(&raw);

	if normalized.is_empty() {
		return Err(Error::NoText);
	}

	Ok(normalized)
}

fn detect_kind(bytes: &[u8], mime_type: Option<&str>) -> Result<Kind> {
	if let Some(mime) = mime_type {
		let essence = mime.split(';').next().unwrap_or(mime).trim();

		match essence {
			PDF_MIME => return Ok(Kind::Pdf),
			_ if essence == DOCX_MIME => return Ok(Kind::Docx),
			_ if essence == PPTX_MIME => return Ok(Kind::Pptx),
			_ if essence.starts_with("text/") => return Ok(Kind::Text),
			_ => {},
		}
	}
	if let Some(kind) = sniff(bytes) {
		return Ok(kind);
	}

	Err(Error::Unsupported { mime: mime_type.unwrap_or("unknown").to_string() })
}

/// Magic-byte detection for files the platform reports with a generic or
/// missing content type.
fn sniff(bytes: &[u8]) -> Option<Kind> {
	if bytes.starts_with(b"%PDF-") {
		return Some(Kind::Pdf);
	}
	if bytes.starts_with(b"PK\x03\x04") {
		return ooxml::sniff_container(bytes);
	}

	None
}

/// CRLF to LF, trailing spaces stripped, runs of blank lines collapsed to one.
fn normalize_whitespace(raw: &str) -> String {
	let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
	let mut out = String::with_capacity(unified.len());
	let mut blank_streak = 0_usize;

	for line in unified.lines() {
		let trimmed = line.trim_end();

		if trimmed.is_empty() {
			blank_streak += 1;

			if blank_streak > 1 {
				continue;
			}
		} else {
			blank_streak = 0;
		}

		out.push_str(trimmed);
		out.push('\n');
	}

	out.trim().to_string()
}
