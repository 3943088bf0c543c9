use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, SyncService};

const DEFAULT_SEARCH_LIMIT: u64 = 8;
const MAX_SEARCH_LIMIT: u64 = 50;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
	pub course_id: String,
	pub query: String,
	/// Result cap. Defaults to 8, clamped to 50.
	pub limit: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchItem {
	pub chunk_id: Uuid,
	pub score: f32,
	pub file_id: String,
	pub file_name: String,
	pub chunk_index: i32,
	pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResponse {
	pub course_id: String,
	pub items: Vec<SearchItem>,
}

impl SyncService {
	/// Similarity search over one course's indexed chunks. The query is
	/// embedded with the same provider the sync pipeline uses, so scores are
	/// comparable across runs. A course that has never completed a sync has
	/// no collection and comes back as `Error::NotFound`.
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let course_id = req.course_id.trim();
		let query = req.query.trim();

		if course_id.is_empty() {
			return Err(Error::InvalidRequest { message: "course_id is required.".to_string() });
		}
		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "query is required.".to_string() });
		}
		if req.limit == Some(0) {
			return Err(Error::InvalidRequest {
				message: "limit must be greater than zero.".to_string(),
			});
		}

		let limit = req.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).min(MAX_SEARCH_LIMIT);
		let texts = vec![query.to_string()];
		let vectors = self.providers.embedding.embed(&self.cfg.providers.embedding, &texts).await?;
		let Some(vector) = vectors.into_iter().next() else {
			return Err(Error::Provider {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};

		if vector.len() != self.cfg.storage.qdrant.vector_dim as usize {
			return Err(Error::Provider {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		let hits = self.qdrant.search_chunks(course_id, vector, limit).await?;
		let items = hits
			.into_iter()
			.map(|hit| SearchItem {
				chunk_id: hit.chunk_id,
				score: hit.score,
				file_id: hit.file_id,
				file_name: hit.file_name,
				chunk_index: hit.chunk_index,
				text: hit.text,
			})
			.collect();

		Ok(SearchResponse { course_id: course_id.to_string(), items })
	}
}
