use crate::{Error, Result};

/// PDF parsing is CPU-bound and the underlying parser is synchronous, so it
/// runs on the blocking pool.
pub(crate) async fn extract(bytes: Vec<u8>) -> Result<String> {
	let handle = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes));

	match handle.await {
		Ok(Ok(text)) => Ok(text),
		Ok(Err(e)) => Err(Error::Extraction { message: e.to_string() }),
		Err(e) => Err(Error::Extraction { message: format!("pdf worker panicked: {e}") }),
	}
}
