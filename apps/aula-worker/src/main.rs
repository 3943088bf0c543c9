use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = aula_worker::Args::parse();
	aula_worker::run(args).await
}
