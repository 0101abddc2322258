//! Shared helpers for the integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::HashMap,
	env,
	path::PathBuf,
	process,
	sync::Arc,
	sync::atomic::{AtomicUsize, Ordering},
};
// crates.io
use httpmock::prelude::*;
// self
use markbox::{
	auth::Secret,
	http::ReqwestHttpClient,
	remote::{AccessType, DropboxService, ServiceDescriptor},
	reqwest::{Client, redirect::Policy},
	session::Negotiator,
	store::{CacheBackend, DurableFiles, MemoryCache, TokenStore},
	url::Url,
};

/// App key used by the integration tests.
pub const TEST_APP_KEY: &str = "app-key-it";
/// App secret used by the integration tests.
pub const TEST_APP_SECRET: &str = "app-secret-it";

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Reqwest client that accepts `httpmock` certificates and never follows redirects.
pub fn test_reqwest_client() -> Client {
	Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.redirect(Policy::none())
		.build()
		.expect("Failed to build insecure Reqwest client for tests.")
}

/// Returns a fresh, not yet created directory under the system temp dir.
pub fn temp_token_dir(label: &str) -> PathBuf {
	let unique = format!(
		"markbox_it_{label}_{}_{}",
		process::id(),
		DIR_COUNTER.fetch_add(1, Ordering::SeqCst)
	);

	env::temp_dir().join(unique)
}

/// Points every endpoint of the descriptor at the mock server.
pub fn mock_descriptor(server: &MockServer) -> ServiceDescriptor {
	let base = Url::parse(&server.base_url()).expect("Mock server base URL should parse.");

	ServiceDescriptor::builder()
		.api_endpoint(base.clone())
		.content_endpoint(base.clone())
		.web_endpoint(base)
		.access_type(AccessType::AppFolder)
		.build()
		.expect("Mock descriptor should build for loopback endpoints.")
}

/// Everything a negotiator test needs to inspect afterwards.
pub struct Harness {
	pub negotiator: Negotiator,
	pub cache: Arc<MemoryCache>,
	pub files: DurableFiles,
}

/// Builds a negotiator over an in-memory cache and durable files in `token_dir`.
pub fn build_harness(server: &MockServer, token_dir: PathBuf) -> Harness {
	let cache = Arc::new(MemoryCache::default());
	let backend: Arc<dyn CacheBackend> = cache.clone();
	let files = DurableFiles::new(token_dir);
	let tokens = TokenStore::new(backend, files.clone());
	let service = DropboxService::with_http_client(
		mock_descriptor(server),
		TEST_APP_KEY,
		Secret::new(TEST_APP_SECRET),
		ReqwestHttpClient::with_client(test_reqwest_client()),
	);

	Harness { negotiator: Negotiator::new(Arc::new(service), tokens), cache, files }
}

/// Query map from literal pairs.
pub fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
	pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
}

/// Absolute URL of a page on the blog under test.
pub fn page_url(path: &str) -> Url {
	Url::parse("http://blog.test").and_then(|base| base.join(path)).expect("Page URL should parse.")
}

/// Writes an authorized access pair straight into the durable files.
pub fn seed_access_files(files: &DurableFiles, token: &str, secret: &str) {
	files.write("s_token", token).expect("Seeding the token file should succeed.");
	files.write("s_token_secret", secret).expect("Seeding the secret file should succeed.");
}

/// Mocks the search endpoint answering with `body`.
pub async fn mock_search<'a>(server: &'a MockServer, body: &str) -> httpmock::Mock<'a> {
	let body = body.to_owned();

	server
		.mock_async(move |when, then| {
			when.method(GET).path("/1/search/sandbox/").query_param("query", ".md");
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await
}

/// Mocks a file download at `path` (remote path, leading slash included).
pub async fn mock_file<'a>(server: &'a MockServer, path: &str, body: &str) -> httpmock::Mock<'a> {
	let url_path = format!("/1/files/sandbox{path}");
	let body = body.to_owned();

	server
		.mock_async(move |when, then| {
			when.method(GET).path(url_path);
			then.status(200).header("content-type", "text/plain").body(body);
		})
		.await
}
