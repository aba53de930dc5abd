use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = xray_api::Args::parse();
	xray_api::run(args).await
}
