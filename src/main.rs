//! Markbox server binary.

// crates.io
use color_eyre::Result;
// self
use markbox::server::{self, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	// Loaded before the subscriber so `RUST_LOG` may live in `.env`.
	let dotenv = server::load_dotenv()?;

	server::init_tracing()?;

	if let Some(path) = dotenv {
		tracing::debug!(path = %path.display(), "Loaded .env file.");
	}

	let config = ServerConfig::from_env()?;

	tracing::info!(
		access_type = config.access_type.root(),
		token_dir = %config.token_dir.display(),
		"Configuration loaded."
	);

	server::run(config).await?;

	Ok(())
}
