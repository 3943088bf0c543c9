use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = aula_api::Args::parse();
	aula_api::run(args).await
}
