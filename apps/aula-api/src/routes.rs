use axum::{
	Json, Router,
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aula_sync::{
	ListFilesRequest, ListFilesResponse, SearchRequest, SearchResponse, SyncAccepted, SyncRequest,
	TaskStatusRequest, TaskStatusResponse,
};

use crate::state::AppState;

#[derive(Debug)]
struct ApiError {
	status: StatusCode,
	error_code: &'static str,
	message: String,
}

#[derive(Serialize)]
struct ErrorBody {
	error_code: &'static str,
	message: String,
}

impl From<aula_sync::Error> for ApiError {
	fn from(err: aula_sync::Error) -> Self {
		let (status, error_code) = match &err {
			aula_sync::Error::InvalidRequest { .. } =>
				(StatusCode::UNPROCESSABLE_ENTITY, "invalid_request"),
			aula_sync::Error::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
			aula_sync::Error::Conflict { .. } => (StatusCode::CONFLICT, "sync_in_progress"),
			aula_sync::Error::Provider { .. } => (StatusCode::BAD_GATEWAY, "provider_error"),
			aula_sync::Error::Storage { .. } | aula_sync::Error::Qdrant { .. } =>
				(StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
		};

		Self { status, error_code, message: err.to_string() }
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/courses/{course_id}/sync", post(request_sync))
		.route("/v1/courses/{course_id}/files", get(list_files))
		.route("/v1/courses/{course_id}/search", post(search))
		.route("/v1/tasks/{run_id}", get(task_status))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn request_sync(
	State(state): State<AppState>,
	Path(course_id): Path<String>,
) -> Result<(StatusCode, Json<SyncAccepted>), ApiError> {
	let accepted = state.service.request_sync(SyncRequest { course_id }).await?;

	Ok((StatusCode::ACCEPTED, Json(accepted)))
}

async fn list_files(
	State(state): State<AppState>,
	Path(course_id): Path<String>,
) -> Result<Json<ListFilesResponse>, ApiError> {
	let files = state.service.list_files(ListFilesRequest { course_id }).await?;

	Ok(Json(files))
}

#[derive(Debug, Deserialize)]
struct SearchBody {
	query: String,
	#[serde(default)]
	limit: Option<u64>,
}

async fn search(
	State(state): State<AppState>,
	Path(course_id): Path<String>,
	Json(body): Json<SearchBody>,
) -> Result<Json<SearchResponse>, ApiError> {
	let request = SearchRequest { course_id, query: body.query, limit: body.limit };
	let results = state.service.search(request).await?;

	Ok(Json(results))
}

async fn task_status(
	State(state): State<AppState>,
	Path(run_id): Path<Uuid>,
) -> Result<Json<TaskStatusResponse>, ApiError> {
	let status = state.service.task_status(TaskStatusRequest { run_id }).await?;

	Ok(Json(status))
}
