use unicode_segmentation::UnicodeSegmentation;

#[derive(Clone, Debug)]
pub struct ChunkingConfig {
	pub max_chars: u32,
	pub overlap_chars: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
	pub chunk_index: i32,
	pub start_offset: usize,
	pub end_offset: usize,
	pub text: String,
}

/// Splits text into chunks of at most `max_chars` characters, preferring
/// sentence boundaries and carrying the last `overlap_chars` characters of
/// each chunk into the next one. Offsets are byte positions into the input,
/// and every chunk is a verbatim slice of it.
pub fn split_text(text: &str, cfg: &ChunkingConfig) -> Vec<Chunk> {
	if text.trim().is_empty() {
		return Vec::new();
	}

	let max_chars = cfg.max_chars.max(1) as usize;
	let mut chunks = Vec::new();
	let mut current = String::new();
	let mut current_chars = 0_usize;
	let mut current_start = 0_usize;
	let mut last_end = 0_usize;
	let mut chunk_index = 0_i32;

	for (idx, segment) in segments(text, max_chars) {
		let segment_chars = segment.chars().count();

		if !current.is_empty() && current_chars + segment_chars > max_chars {
			chunks.push(Chunk {
				chunk_index,
				start_offset: current_start,
				end_offset: last_end,
				text: current.clone(),
			});

			chunk_index += 1;

			let overlap = overlap_tail(&current, cfg.overlap_chars as usize);
			let overlap_chars = overlap.chars().count();

			// An overlap the next segment cannot share a chunk with would only
			// repeat the previous chunk's tail.
			if overlap_chars + segment_chars > max_chars {
				current.clear();

				current_chars = 0;
			} else {
				current_start = last_end - overlap.len();
				current_chars = overlap_chars;
				current = overlap;
			}
		}
		if current.is_empty() {
			current_start = idx;
		}

		current.push_str(segment);

		current_chars += segment_chars;
		last_end = idx + segment.len();
	}

	if !current.is_empty() {
		chunks.push(Chunk {
			chunk_index,
			start_offset: current_start,
			end_offset: last_end,
			text: current,
		});
	}

	chunks
}

/// Sentence-bounded segments, with any single sentence longer than the budget
/// hard-cut at character boundaries.
fn segments(text: &str, max_chars: usize) -> Vec<(usize, &str)> {
	let mut out = Vec::new();

	for (idx, sentence) in text.split_sentence_bound_indices() {
		if sentence.chars().count() <= max_chars {
			out.push((idx, sentence));

			continue;
		}

		let mut piece_start = 0_usize;
		let mut count = 0_usize;

		for (offset, _) in sentence.char_indices() {
			if count == max_chars {
				out.push((idx + piece_start, &sentence[piece_start..offset]));

				piece_start = offset;
				count = 0;
			}

			count += 1;
		}

		if piece_start < sentence.len() {
			out.push((idx + piece_start, &sentence[piece_start..]));
		}
	}

	out
}

fn overlap_tail(text: &str, overlap_chars: usize) -> String {
	if overlap_chars == 0 {
		return String::new();
	}

	let total = text.chars().count();
	let skip = total.saturating_sub(overlap_chars);

	text.chars().skip(skip).collect()
}
