//! Axum route table and handlers.
//!
//! Every content handler runs behind the render cache; on a miss it connects the remote session
//! (which may end in a redirect) before touching content.

// std
use std::path::Path;
// crates.io
use axum::{
	Router,
	extract::{FromRequestParts, State},
	http::{
		HeaderMap, StatusCode, Uri,
		header::{CONTENT_TYPE, HOST, LOCATION},
		request::Parts,
	},
	response::{IntoResponse, Response},
	routing::get,
};
use percent_encoding::percent_decode_str;
use tower_http::{services::ServeDir, trace::TraceLayer};
// self
use crate::{
	_prelude::*,
	cache::{FEED_KEY, INDEX_KEY, RenderCache},
	content,
	server::{BlogSettings, Renderer},
	session::Negotiator,
};

const HTML: &str = "text/html; charset=utf-8";
const ATOM: &str = "application/atom+xml; charset=utf-8";
const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Shared handler state.
pub struct AppState {
	/// Remote session negotiator.
	pub negotiator: Negotiator,
	/// Rendered-page cache.
	pub cache: RenderCache,
	/// Page and feed renderer.
	pub renderer: Arc<dyn Renderer>,
	/// Presentation settings.
	pub blog: BlogSettings,
}
impl AppState {
	/// Bundles the handler dependencies.
	pub fn new(
		negotiator: Negotiator,
		cache: RenderCache,
		renderer: Arc<dyn Renderer>,
		blog: BlogSettings,
	) -> Self {
		Self { negotiator, cache, renderer, blog }
	}

	async fn respond(&self, result: Result<String>, content_type: &'static str) -> Response {
		match result {
			Ok(body) => ([(CONTENT_TYPE, content_type)], body).into_response(),
			Err(Error::AuthorizationRequired { authorize_url }) =>
				(StatusCode::FOUND, [(LOCATION, authorize_url.to_string())]).into_response(),
			Err(e) if e.is_not_found() => self.not_found(),
			Err(e) => {
				tracing::error!(error = %e, "Request failed.");

				if matches!(e, Error::RemoteAuth { .. }) {
					if let Err(e) = self.negotiator.invalidate().await {
						tracing::error!(error = %e, "Failed to invalidate the remote session.");
					}
				}

				(
					StatusCode::INTERNAL_SERVER_ERROR,
					[(CONTENT_TYPE, HTML)],
					self.renderer.failure(&self.blog),
				)
					.into_response()
			},
		}
	}

	fn not_found(&self) -> Response {
		(StatusCode::NOT_FOUND, [(CONTENT_TYPE, HTML)], self.renderer.not_found(&self.blog))
			.into_response()
	}
}
impl Debug for AppState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppState")
			.field("negotiator", &self.negotiator)
			.field("cache", &self.cache)
			.field("blog", &self.blog)
			.finish_non_exhaustive()
	}
}

/// Query map plus absolute URL of the incoming request.
#[derive(Clone, Debug)]
pub struct PageRequest {
	/// Decoded query parameters.
	pub query: HashMap<String, String>,
	/// Absolute URL rebuilt from the `Host` header.
	pub url: Url,
}
impl PageRequest {
	/// Builds the request context from raw parts.
	pub fn from_parts(headers: &HeaderMap, uri: &Uri) -> Result<Self> {
		let query = uri
			.query()
			.map(|raw| url::form_urlencoded::parse(raw.as_bytes()).into_owned().collect())
			.unwrap_or_default();
		let host = headers
			.get(HOST)
			.and_then(|value| value.to_str().ok())
			.or_else(|| uri.authority().map(|authority| authority.as_str()))
			.unwrap_or("localhost");
		let scheme = headers
			.get(FORWARDED_PROTO)
			.and_then(|value| value.to_str().ok())
			.filter(|proto| matches!(*proto, "http" | "https"))
			.unwrap_or("http");
		let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
		let raw = format!("{scheme}://{host}{path_and_query}");
		let url = Url::parse(&raw)
			.map_err(|source| crate::error::ConfigError::InvalidUrl { url: raw, source })?;

		Ok(Self { query, url })
	}

	/// Site root (`scheme://host/`).
	pub fn site(&self) -> Url {
		let mut site = self.url.clone();

		site.set_path("/");
		site.set_query(None);
		site.set_fragment(None);

		site
	}
}
impl<S> FromRequestParts<S> for PageRequest
where
	S: Send + Sync,
{
	type Rejection = Response;

	async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
		Self::from_parts(&parts.headers, &parts.uri)
			.map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()).into_response())
	}
}

/// Builds the route table.
///
/// `public_folder` is mounted under `/{basename}`; unmatched `GET` paths are treated as post
/// slugs, so unknown pages end in the not-found page.
pub fn router(state: Arc<AppState>, public_folder: &Path) -> Router {
	let feed_path = state.blog.feed_path();
	let mut router = Router::new().route("/", get(index)).route(&feed_path, get(feed));

	match public_folder
		.file_name()
		.and_then(|name| name.to_str())
		.filter(|name| !name.contains(['{', '}', '*']))
	{
		Some(mount) => {
			router = router.nest_service(&format!("/{mount}"), ServeDir::new(public_folder));
		},
		None => tracing::warn!(
			folder = %public_folder.display(),
			"Public folder has no usable name; static files are disabled."
		),
	}

	router.fallback(get(post)).layer(TraceLayer::new_for_http()).with_state(state)
}

async fn index(State(state): State<Arc<AppState>>, page: PageRequest) -> Response {
	let result = state
		.cache
		.cached(INDEX_KEY, &page.query, || async {
			let session = state.negotiator.connect(&page.query, &page.url).await?;
			let posts = content::listing(&session).await?;

			Ok(state.renderer.index(&state.blog, &posts))
		})
		.await;

	state.respond(result, HTML).await
}

async fn feed(State(state): State<Arc<AppState>>, page: PageRequest) -> Response {
	let result = state
		.cache
		.cached(FEED_KEY, &page.query, || async {
			let session = state.negotiator.connect(&page.query, &page.url).await?;
			let posts = content::listing(&session).await?;
			let site = page.site();
			let feed_url = crate::session::callback_url(&page.url);

			Ok(state.renderer.feed(&state.blog, &posts, &site, &feed_url))
		})
		.await;

	state.respond(result, ATOM).await
}

async fn post(State(state): State<Arc<AppState>>, page: PageRequest) -> Response {
	let decoded = percent_decode_str(page.url.path()).decode_utf8_lossy();
	let slug = decoded.trim_matches('/');

	if slug.is_empty() {
		return state.not_found();
	}

	let key = format!("/{slug}");
	let result = state
		.cache
		.cached(&key, &page.query, || async {
			let session = state.negotiator.connect(&page.query, &page.url).await?;
			let article = content::read_post(&session, slug).await?;

			Ok(state.renderer.post(&state.blog, &article))
		})
		.await;

	state.respond(result, HTML).await
}
