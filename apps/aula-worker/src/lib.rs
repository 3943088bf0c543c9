use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod worker;

#[derive(Debug, Parser)]
#[command(
	version = aula_cli::VERSION,
	rename_all = "kebab",
	styles = aula_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: std::path::PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = aula_config::load(&args.config)?;
	let filter = EnvFilter::new(config.service.log_level.clone());
	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = aula_storage::db::Db::connect(&config.storage.postgres).await?;
	db.ensure_schema().await?;
	let qdrant = aula_storage::qdrant::QdrantStore::new(&config.storage.qdrant)?;
	let service = aula_sync::SyncService::new(config, db, qdrant);

	worker::run_worker(service).await
}
