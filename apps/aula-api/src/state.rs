use std::sync::Arc;

use aula_storage::{db::Db, qdrant::QdrantStore};
use aula_sync::SyncService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<SyncService>,
}
impl AppState {
	pub async fn new(config: aula_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let qdrant = QdrantStore::new(&config.storage.qdrant)?;
		let service = SyncService::new(config, db, qdrant);

		Ok(Self { service: Arc::new(service) })
	}
}
