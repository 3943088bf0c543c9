use std::io::{Cursor, Read};

use quick_xml::{Reader, events::Event};
use zip::ZipArchive;

use crate::{Error, Kind, Result};

/// Peeks inside a zip container to tell Office formats apart when the
/// declared MIME type was generic.
pub(crate) fn sniff_container(bytes: &[u8]) -> Option<Kind> {
	let archive = ZipArchive::new(Cursor::new(bytes)).ok()?;
	let mut has_document = false;
	let mut has_slides = false;

	for name in archive.file_names() {
		if name == "word/document.xml" {
			has_document = true;
		}
		if name.starts_with("ppt/slides/slide") {
			has_slides = true;
		}
	}
	if has_document {
		return Some(Kind::Docx);
	}
	if has_slides {
		return Some(Kind::Pptx);
	}

	None
}

pub(crate) fn extract_docx(bytes: &[u8]) -> Result<String> {
	let mut archive = open_archive(bytes)?;
	let xml = read_entry(&mut archive, "word/document.xml")?;

	collect_runs(&xml, b"w:t", b"w:p")
}

pub(crate) fn extract_pptx(bytes: &[u8]) -> Result<String> {
	let mut archive = open_archive(bytes)?;
	let mut slides = archive
		.file_names()
		.filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
		.collect::<Vec<_>>();

	// Archive order is arbitrary; presentation order comes from the slide
	// number embedded in the entry name.
	slides.sort_by_key(|(n, _)| *n);

	let mut out = String::new();

	for (_, name) in slides {
		let xml = read_entry(&mut archive, &name)?;
		// Paragraph ends already close each line; only the slide separator is
		// added here.
		let text = collect_runs(&xml, b"a:t", b"a:p")?;

		if !out.is_empty() {
			out.push('\n');
		}

		out.push_str(&text);
	}

	Ok(out)
}

fn open_archive(bytes: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>> {
	ZipArchive::new(Cursor::new(bytes))
		.map_err(|e| Error::Extraction { message: format!("invalid office container: {e}") })
}

fn read_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<String> {
	let mut entry = archive
		.by_name(name)
		.map_err(|e| Error::Extraction { message: format!("missing {name}: {e}") })?;
	let mut xml = String::new();

	entry
		.read_to_string(&mut xml)
		.map_err(|e| Error::Extraction { message: format!("unreadable {name}: {e}") })?;

	Ok(xml)
}

fn slide_number(name: &str) -> Option<u32> {
	name.strip_prefix("ppt/slides/slide")?.strip_suffix(".xml")?.parse().ok()
}

/// Walks one OOXML part and concatenates the text runs. `text_tag` marks a
/// run, `para_tag` marks a paragraph end. Word additionally encodes tabs and
/// line breaks as empty elements.
fn collect_runs(xml: &str, text_tag: &[u8], para_tag: &[u8]) -> Result<String> {
	let mut reader = Reader::from_str(xml);
	let mut out = String::new();
	let mut in_run = false;

	loop {
		match reader.read_event() {
			Ok(Event::Start(e)) if e.name().as_ref() == text_tag => {
				in_run = true;
			},
			Ok(Event::End(e)) if e.name().as_ref() == text_tag => {
				in_run = false;
			},
			Ok(Event::Text(t)) if in_run => {
				let piece = t
					.unescape()
					.map_err(|e| Error::Extraction { message: format!("bad xml text: {e}") })?;

				out.push_str(&piece);
			},
			Ok(Event::End(e)) if e.name().as_ref() == para_tag => {
				out.push('\n');
			},
			Ok(Event::Start(e) | Event::Empty(e)) if e.name().as_ref() == b"w:tab" => {
				out.push('\t');
			},
			Ok(Event::Start(e) | Event::Empty(e)) if e.name().as_ref() == b"w:br" => {
				out.push('\n');
			},
			Ok(Event::Eof) => break,
			Ok(_) => {},
			Err(e) => return Err(Error::Extraction { message: format!("bad xml: {e}") }),
		}
	}

	Ok(out)
}
