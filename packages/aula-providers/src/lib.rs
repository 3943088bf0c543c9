pub mod campus;
pub mod embedding;

mod error;

pub use error::{Error, Result};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(
		AUTHORIZATION,
		format!("Bearer {api_key}")
			.parse()
			.map_err(|_| Error::Rejected { message: "API key is not a valid header value.".to_string() })?,
	);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::Rejected {
				message: "Default header values must be strings.".to_string(),
			});
		};
		let name = HeaderName::from_bytes(key.as_bytes())
			.map_err(|e| Error::Rejected { message: format!("Bad header name {key}: {e}") })?;

		headers.insert(
			name,
			raw.parse()
				.map_err(|_| Error::Rejected { message: format!("Bad header value for {key}.") })?,
		);
	}

	Ok(headers)
}
