//! Rendered-page cache applied uniformly to every content route.
//!
//! A hit returns the stored body untouched. A miss runs the render closure and stores its output.
//! Requests carrying `uncache_key=<configured secret>` drop the entry first, forcing a re-render.
//! Failed renders (including authorization redirects) are never stored.

// self
use crate::{_prelude::*, auth::Secret, store::CacheBackend};

/// Query parameter that requests cache invalidation.
pub const UNCACHE_PARAM: &str = "uncache_key";
/// Cache key of the rendered index page.
pub const INDEX_KEY: &str = "index";
/// Cache key of the rendered feed.
pub const FEED_KEY: &str = "feed";

/// Read-through cache of rendered response bodies.
#[derive(Clone)]
pub struct RenderCache {
	backend: Arc<dyn CacheBackend>,
	uncache_key: Option<Secret>,
}
impl RenderCache {
	/// Wraps `backend`; without an `uncache_key` invalidation requests are ignored.
	pub fn new(backend: Arc<dyn CacheBackend>, uncache_key: Option<Secret>) -> Self {
		let uncache_key = uncache_key.filter(|secret| !secret.is_empty());

		Self { backend, uncache_key }
	}

	/// Whether `query` carries the configured invalidation secret.
	pub fn wants_invalidation(&self, query: &HashMap<String, String>) -> bool {
		match (&self.uncache_key, query.get(UNCACHE_PARAM)) {
			(Some(secret), Some(candidate)) => secret.matches(candidate),
			_ => false,
		}
	}

	/// Returns the cached body for `key`, rendering and storing it on a miss.
	pub async fn cached<F, Fut>(
		&self,
		key: &str,
		query: &HashMap<String, String>,
		render: F,
	) -> Result<String>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<String>>,
	{
		if self.wants_invalidation(query) {
			tracing::info!(key, "Invalidating cached page.");

			self.backend.delete(key).await?;
		} else if query.contains_key(UNCACHE_PARAM) {
			tracing::debug!(key, "Ignoring invalidation request with a wrong key.");
		}

		// An empty body counts as absent.
		if let Some(body) = self.backend.get(key).await?.filter(|body| !body.is_empty()) {
			tracing::trace!(key, "Cache hit.");

			return Ok(body);
		}

		let body = render().await?;

		self.backend.set(key, body.clone()).await?;

		Ok(body)
	}

	/// Removes `key` unconditionally.
	pub async fn invalidate(&self, key: &str) -> Result<()> {
		Ok(self.backend.delete(key).await?)
	}
}
impl Debug for RenderCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RenderCache")
			.field("invalidation_enabled", &self.uncache_key.is_some())
			.finish_non_exhaustive()
	}
}
