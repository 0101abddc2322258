#![cfg(feature = "server")]

mod common;

// std
use std::{
	collections::HashMap,
	fs,
	net::SocketAddr,
	path::{Path, PathBuf},
	sync::Arc,
};
// crates.io
use httpmock::prelude::*;
use tokio::net::TcpListener;
// self
use common::*;
use markbox::{
	auth::Secret,
	cache::RenderCache,
	reqwest::{StatusCode, header},
	server::{AppState, BlogSettings, PlainRenderer, router},
	url::Url,
};

const UNCACHE: &str = "flush-it";

struct App {
	addr: SocketAddr,
	token_dir: PathBuf,
}
impl App {
	fn url(&self, path: &str) -> String {
		format!("http://{}{path}", self.addr)
	}
}
impl Drop for App {
	fn drop(&mut self) {
		let _ = fs::remove_dir_all(&self.token_dir);
	}
}

async fn spawn_app(server: &MockServer, label: &str, authorized: bool) -> App {
	let token_dir = temp_token_dir(label);
	let Harness { negotiator, cache, files } = build_harness(server, token_dir.clone());

	if authorized {
		seed_access_files(&files, "acc-token", "acc-secret");
	}

	let public = token_dir.join("public");

	fs::create_dir_all(&public).expect("Public folder should be creatable.");
	fs::write(public.join("style.css"), "body { margin: 0; }").expect("Static file should be writable.");

	let render_cache = RenderCache::new(cache, Some(Secret::new(UNCACHE)));
	let state = AppState::new(negotiator, render_cache, Arc::new(PlainRenderer), BlogSettings::default());
	let app = router(Arc::new(state), Path::new(&public));
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Test listener should bind.");
	let addr = listener.local_addr().expect("Test listener should expose its address.");

	tokio::spawn(async move { axum::serve(listener, app).await });

	App { addr, token_dir }
}

#[tokio::test]
async fn unauthenticated_request_redirects_to_authorization_page() {
	let server = MockServer::start_async().await;
	let request_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/1/oauth/request_token");
			then.status(200).body("oauth_token=req-token&oauth_token_secret=req-secret");
		})
		.await;
	let app = spawn_app(&server, "server_redirect", false).await;
	let response = test_reqwest_client()
		.get(app.url("/?uncache_key=nope"))
		.send()
		.await
		.expect("Request should reach the server.");

	request_mock.assert_async().await;

	assert_eq!(response.status(), StatusCode::FOUND);

	let location = response
		.headers()
		.get(header::LOCATION)
		.and_then(|value| value.to_str().ok())
		.expect("Redirect should carry a Location header.");
	let location = Url::parse(location).expect("Location should be absolute.");
	let pairs: HashMap<_, _> = location.query_pairs().into_owned().collect();

	assert_eq!(location.path(), "/1/oauth/authorize");
	assert_eq!(pairs.get("oauth_token"), Some(&"req-token".to_owned()));
	assert_eq!(pairs.get("oauth_callback"), Some(&app.url("/")));
}

#[tokio::test]
async fn empty_folder_serves_feed_without_entries() {
	let server = MockServer::start_async().await;
	let app = spawn_app(&server, "server_feed", true).await;

	mock_search(&server, "[]").await;

	let response = test_reqwest_client()
		.get(app.url("/articles.xml"))
		.send()
		.await
		.expect("Request should reach the server.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(
		response.headers().get(header::CONTENT_TYPE).and_then(|value| value.to_str().ok()),
		Some("application/atom+xml; charset=utf-8")
	);

	let body = response.text().await.expect("Feed body should be readable.");

	assert!(body.contains("<feed xmlns=\"http://www.w3.org/2005/Atom\">"));
	assert!(!body.contains("<entry>"));
}

#[tokio::test]
async fn unknown_post_is_a_not_found_page() {
	let server = MockServer::start_async().await;
	let app = spawn_app(&server, "server_404", true).await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/1/files/sandbox/ghost.md");
			then.status(404).body("{\"error\": \"File not found\"}");
		})
		.await;

	let response = test_reqwest_client()
		.get(app.url("/ghost"))
		.send()
		.await
		.expect("Request should reach the server.");

	assert_eq!(response.status(), StatusCode::NOT_FOUND);
	assert!(response.text().await.expect("Body should be readable.").contains("Page not found"));
}

#[tokio::test]
async fn index_is_cached_until_invalidated() {
	let server = MockServer::start_async().await;
	let app = spawn_app(&server, "server_cache", true).await;
	let search_mock = mock_search(&server, r#"[{"path": "/hello.md", "is_dir": false}]"#).await;

	mock_file(&server, "/hello.md", "Title: Hello <World>\nDate: 2012-01-05\n\nBody.").await;

	let client = test_reqwest_client();

	for path in ["/", "/", "/?uncache_key=wrong"] {
		let body = client
			.get(app.url(path))
			.send()
			.await
			.expect("Request should reach the server.")
			.text()
			.await
			.expect("Body should be readable.");

		assert!(body.contains("<a href=\"/hello\">Hello &lt;World&gt;</a>"));
	}

	search_mock.assert_hits_async(1).await;

	let response = client
		.get(app.url(&format!("/?uncache_key={UNCACHE}")))
		.send()
		.await
		.expect("Request should reach the server.");

	assert_eq!(response.status(), StatusCode::OK);
	search_mock.assert_hits_async(2).await;
}

#[tokio::test]
async fn post_without_metadata_uses_slug_title() {
	let server = MockServer::start_async().await;
	let app = spawn_app(&server, "server_post", true).await;

	mock_file(&server, "/notes/untitled.md", "Just *text*.").await;

	let response = test_reqwest_client()
		.get(app.url("/notes/untitled"))
		.send()
		.await
		.expect("Request should reach the server.");

	assert_eq!(response.status(), StatusCode::OK);

	let body = response.text().await.expect("Body should be readable.");

	assert!(body.contains("<h1>notes/untitled</h1>"));
	assert!(body.contains("<em>text</em>"));
}

#[tokio::test]
async fn public_folder_is_served_statically() {
	let server = MockServer::start_async().await;
	let app = spawn_app(&server, "server_static", true).await;
	let response = test_reqwest_client()
		.get(app.url("/public/style.css"))
		.send()
		.await
		.expect("Request should reach the server.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(response.text().await.expect("Body should be readable."), "body { margin: 0; }");
}
