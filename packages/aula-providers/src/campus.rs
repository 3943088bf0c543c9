//! Client for the learning platform's course file API. The platform is the
//! source of truth for what a course contains; nothing here is cached.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use aula_config::Campus;
use aula_domain::SourceFile;

use crate::{Error, Result};

const PER_PAGE: usize = 100;

/// Lists every file in the course's designated folder, following numeric
/// pagination until a short page.
pub async fn list_course_files(cfg: &Campus, course_id: &str) -> Result<Vec<SourceFile>> {
	let client = build_client(cfg.timeout_ms)?;
	let mut files = Vec::new();
	let mut page = 1_usize;

	loop {
		let url =
			format!("{}/courses/{course_id}/files?per_page={PER_PAGE}&page={page}", cfg.api_base);
		let json: Value = client
			.get(url)
			.bearer_auth(&cfg.api_token)
			.send()
			.await
			.map_err(Error::from_reqwest)?
			.error_for_status()
			.map_err(Error::from_reqwest)?
			.json()
			.await
			.map_err(Error::from_reqwest)?;
		let batch = parse_listing_page(&json)?;
		let batch_len = batch.len();

		files.extend(batch);

		if batch_len < PER_PAGE {
			break;
		}

		page += 1;
	}

	Ok(files)
}

pub async fn download(cfg: &Campus, file: &SourceFile, timeout_ms: u64) -> Result<Vec<u8>> {
	let client = build_client(timeout_ms)?;
	let bytes = client
		.get(&file.download_url)
		.bearer_auth(&cfg.api_token)
		.send()
		.await
		.map_err(Error::from_reqwest)?
		.error_for_status()
		.map_err(Error::from_reqwest)?
		.bytes()
		.await
		.map_err(Error::from_reqwest)?;

	Ok(bytes.to_vec())
}

fn build_client(timeout_ms: u64) -> Result<Client> {
	Client::builder()
		.timeout(Duration::from_millis(timeout_ms))
		.build()
		.map_err(Error::from_reqwest)
}

fn parse_listing_page(json: &Value) -> Result<Vec<SourceFile>> {
	let items = json.as_array().ok_or_else(|| Error::Malformed {
		message: "File listing must be a JSON array.".to_string(),
	})?;
	let mut files = Vec::with_capacity(items.len());

	for item in items {
		files.push(parse_listing_item(item)?);
	}

	Ok(files)
}

fn parse_listing_item(item: &Value) -> Result<SourceFile> {
	let id = match item.get("id") {
		Some(Value::String(s)) if !s.is_empty() => s.clone(),
		Some(Value::Number(n)) => n.to_string(),
		_ =>
			return Err(Error::Malformed { message: "File entry is missing an id.".to_string() }),
	};
	let download_url = item
		.get("url")
		.or_else(|| item.get("download_url"))
		.and_then(Value::as_str)
		.filter(|s| !s.is_empty())
		.ok_or_else(|| Error::Malformed {
			message: format!("File entry {id} is missing a download url."),
		})?
		.to_string();
	let name = item
		.get("display_name")
		.or_else(|| item.get("filename"))
		.and_then(Value::as_str)
		.unwrap_or(&id)
		.to_string();
	let mime_type = item
		.get("content-type")
		.or_else(|| item.get("content_type"))
		.and_then(Value::as_str)
		.map(str::to_string);
	// A timestamp the platform did not send, or sent in a shape we cannot
	// read, downgrades that file to content fingerprinting.
	let modified_at = item
		.get("updated_at")
		.or_else(|| item.get("modified_at"))
		.and_then(Value::as_str)
		.and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok());

	Ok(SourceFile { id, name, mime_type, modified_at, download_url })
}
