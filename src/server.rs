//! HTTP front end: configuration, rendering, and the axum route table.

pub mod config;
pub mod render;
pub mod routes;

pub use config::{BlogSettings, ServerConfig, load_dotenv};
pub use render::{PlainRenderer, Renderer};
pub use routes::{AppState, PageRequest, router};

// std
use std::{io, net::SocketAddr};
// crates.io
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
// self
use crate::{
	_prelude::*,
	cache::RenderCache,
	remote::{DropboxService, ServiceDescriptor},
	session::Negotiator,
	store::{CacheBackend, DurableFiles, MemoryCache, TokenStore},
};

const DEFAULT_FILTER: &str = "markbox=info,tower_http=info";

/// Failures that stop the server.
#[derive(Debug, ThisError)]
pub enum ServeError {
	/// State construction failed.
	#[error(transparent)]
	Setup(#[from] Error),
	/// The listen address could not be bound.
	#[error("Failed to bind {addr}.")]
	Bind {
		/// Requested address.
		addr: SocketAddr,
		/// Underlying IO failure.
		#[source]
		source: io::Error,
	},
	/// The accept loop stopped with an error.
	#[error("Server stopped unexpectedly.")]
	Serve(#[source] io::Error),
}

/// Installs the global `tracing` subscriber, honoring `RUST_LOG`.
pub fn init_tracing() -> Result<(), tracing_subscriber::util::TryInitError> {
	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
		.with(tracing_subscriber::fmt::layer())
		.try_init()
}

impl AppState {
	/// Wires the production dependencies described by `config`.
	///
	/// One in-process cache backs both the token store and the render cache.
	pub fn from_config(config: &ServerConfig) -> Result<Self> {
		let descriptor = ServiceDescriptor::builder()
			.access_type(config.access_type)
			.build()
			.map_err(crate::error::ConfigError::from)?;
		let service =
			DropboxService::new(descriptor, config.app_key.clone(), config.app_secret.clone())?;
		let backend: Arc<dyn CacheBackend> = Arc::new(MemoryCache::default());
		let tokens = TokenStore::new(backend.clone(), DurableFiles::new(config.token_dir.clone()));
		let negotiator = Negotiator::new(Arc::new(service), tokens);
		let cache = RenderCache::new(backend, config.uncache_key.clone());

		Ok(Self::new(negotiator, cache, Arc::new(PlainRenderer), config.blog.clone()))
	}
}

/// Builds the application from `config` and serves it until the process stops.
pub async fn run(config: ServerConfig) -> Result<(), ServeError> {
	let state = Arc::new(AppState::from_config(&config)?);
	let app = router(state, &config.public_folder);
	let addr = config.bind_addr();
	let listener = TcpListener::bind(addr).await.map_err(|source| ServeError::Bind { addr, source })?;

	tracing::info!(%addr, feed = %config.blog.feed_path(), "Markbox listening.");

	axum::serve(listener, app).await.map_err(ServeError::Serve)
}
