use std::{collections::HashMap, sync::Arc};

use qdrant_client::{
	Payload, Qdrant,
	qdrant::{
		Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointId,
		PointStruct, Query, QueryPointsBuilder, ScoredPoint, UpsertPointsBuilder, Value,
		VectorParamsBuilder, point_id::PointIdOptions, value::Kind,
	},
};
use uuid::Uuid;

use crate::{Error, Result};

const MAX_SLUG_CHARS: usize = 48;

/// The client is behind an `Arc` so per-file sync tasks can share one store
/// without reconnecting.
#[derive(Clone)]
pub struct QdrantStore {
	pub client: Arc<Qdrant>,
	pub collection_prefix: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &aula_config::Qdrant) -> Result<Self> {
		let client = Arc::new(Qdrant::from_url(&cfg.url).build()?);

		Ok(Self {
			client,
			collection_prefix: cfg.collection_prefix.clone(),
			vector_dim: cfg.vector_dim,
		})
	}

	pub fn collection_name(&self, course_id: &str) -> String {
		collection_name(&self.collection_prefix, course_id)
	}

	/// Create-if-absent. Safe to call on every run; the collection carries a
	/// single unnamed cosine vector of the configured dimension.
	pub async fn ensure_collection(&self, course_id: &str) -> Result<String> {
		let collection = self.collection_name(course_id);

		if !self.client.collection_exists(&collection).await? {
			self.client
				.create_collection(CreateCollectionBuilder::new(&collection).vectors_config(
					VectorParamsBuilder::new(u64::from(self.vector_dim), Distance::Cosine),
				))
				.await?;
		}

		Ok(collection)
	}

	/// Swaps a file's chunk set: delete everything under its `file_id`, then
	/// upsert the replacement. Both calls wait for the write to land so the
	/// ledger is never marked `completed` ahead of the store.
	pub async fn replace_chunks(
		&self,
		course_id: &str,
		file_id: &str,
		chunks: Vec<ChunkPoint>,
	) -> Result<()> {
		let collection = self.ensure_collection(course_id).await?;

		self.client
			.delete_points(
				DeletePointsBuilder::new(&collection)
					.points(Filter::must([Condition::matches("file_id", file_id.to_string())]))
					.wait(true),
			)
			.await?;

		if chunks.is_empty() {
			return Ok(());
		}

		let points =
			chunks.into_iter().map(|chunk| chunk.into_point(course_id)).collect::<Vec<_>>();

		self.client
			.upsert_points(UpsertPointsBuilder::new(&collection, points).wait(true))
			.await?;

		Ok(())
	}

	/// Removes every chunk belonging to a file. A course that was never
	/// synced has no collection, which counts as already clean.
	pub async fn delete_file_chunks(&self, course_id: &str, file_id: &str) -> Result<()> {
		let collection = self.collection_name(course_id);

		if !self.client.collection_exists(&collection).await? {
			return Ok(());
		}

		self.client
			.delete_points(
				DeletePointsBuilder::new(&collection)
					.points(Filter::must([Condition::matches("file_id", file_id.to_string())]))
					.wait(true),
			)
			.await?;

		Ok(())
	}

	pub async fn search_chunks(
		&self,
		course_id: &str,
		vector: Vec<f32>,
		limit: u64,
	) -> Result<Vec<ChunkHit>> {
		let collection = self.collection_name(course_id);

		if !self.client.collection_exists(&collection).await? {
			return Err(Error::NotFound(format!(
				"Course {course_id} has no indexed content."
			)));
		}

		let response = self
			.client
			.query(
				QueryPointsBuilder::new(&collection)
					.query(Query::new_nearest(vector))
					.limit(limit)
					.with_payload(true),
			)
			.await?;

		Ok(response.result.into_iter().filter_map(hit_from_point).collect())
	}
}

/// Deterministic per-course collection name. ASCII-safe course ids map
/// straight through; anything lossy (case folding, exotic characters,
/// truncation) gets a short content hash so distinct courses never share a
/// collection.
pub fn collection_name(prefix: &str, course_id: &str) -> String {
	let mut slug = String::with_capacity(course_id.len().min(MAX_SLUG_CHARS));

	for c in course_id.chars().take(MAX_SLUG_CHARS) {
		if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
			slug.push(c.to_ascii_lowercase());
		} else {
			slug.push('-');
		}
	}

	if !slug.is_empty() && slug == course_id {
		return format!("{prefix}_{slug}");
	}

	let hex = blake3::hash(course_id.as_bytes()).to_hex();
	let hash8 = &hex.as_str()[..8];

	format!("{prefix}_{slug}_{hash8}")
}

/// One chunk ready to be written, vector included.
pub struct ChunkPoint {
	pub chunk_id: Uuid,
	pub file_id: String,
	pub file_name: String,
	pub chunk_index: i32,
	pub text: String,
	pub vector: Vec<f32>,
}
impl ChunkPoint {
	fn into_point(self, course_id: &str) -> PointStruct {
		let id = self.chunk_id.to_string();
		let mut payload = Payload::new();

		payload.insert("course_id", course_id.to_string());
		payload.insert("file_id", self.file_id);
		payload.insert("file_name", self.file_name);
		payload.insert("chunk_index", Value::from(i64::from(self.chunk_index)));
		payload.insert("text", self.text);

		PointStruct::new(id, self.vector, payload)
	}
}

/// One similarity hit with the payload unpacked for citation.
#[derive(Debug)]
pub struct ChunkHit {
	pub chunk_id: Uuid,
	pub score: f32,
	pub file_id: String,
	pub file_name: String,
	pub chunk_index: i32,
	pub text: String,
}

fn hit_from_point(point: ScoredPoint) -> Option<ChunkHit> {
	let chunk_id = point.id.as_ref().and_then(point_id_to_uuid)?;
	let file_id = payload_string(&point.payload, "file_id")?;
	let text = payload_string(&point.payload, "text")?;
	let file_name = payload_string(&point.payload, "file_name").unwrap_or_default();
	let chunk_index =
		payload_i64(&point.payload, "chunk_index").and_then(|v| i32::try_from(v).ok()).unwrap_or(0);

	Some(ChunkHit { chunk_id, score: point.score, file_id, file_name, chunk_index, text })
}

fn point_id_to_uuid(point_id: &PointId) -> Option<Uuid> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Uuid::parse_str(id).ok(),
		_ => None,
	}
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.to_string()),
		_ => None,
	}
}

fn payload_i64(payload: &HashMap<String, Value>, key: &str) -> Option<i64> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::IntegerValue(value)) => Some(*value),
		_ => None,
	}
}
