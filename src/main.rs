//! Broker binary: parse flags, install logging, serve until Ctrl-C.

// crates.io
use clap::Parser;
use color_eyre::Result;
// self
use app_token_broker::{obs, server::ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ServerConfig::parse();

	obs::init_tracing(config.log_json);

	app_token_broker::server::serve(config).await?;

	Ok(())
}
