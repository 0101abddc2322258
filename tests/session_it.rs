#![cfg(feature = "reqwest")]

mod common;

// std
use std::{collections::HashMap, sync::Arc};
// crates.io
use httpmock::prelude::*;
// self
use common::*;
use markbox::{error::Error, session::NegotiatorState, store::CacheBackend};

const REQUEST_BODY: &str = "oauth_token_secret=req-secret&oauth_token=req-token";
const ACCESS_BODY: &str = "oauth_token_secret=acc-secret&oauth_token=acc-token";

async fn mock_request_token(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST).path("/1/oauth/request_token").header_exists("authorization");
			then.status(200).header("content-type", "text/plain").body(REQUEST_BODY);
		})
		.await
}

async fn mock_access_token<'a>(
	server: &'a MockServer,
	status: u16,
	body: &'static str,
) -> httpmock::Mock<'a> {
	server
		.mock_async(move |when, then| {
			when.method(POST).path("/1/oauth/access_token").header_exists("authorization");
			then.status(status).header("content-type", "text/plain").body(body);
		})
		.await
}

async fn start_handshake(harness: &Harness) {
	let err = harness
		.negotiator
		.connect(&HashMap::new(), &page_url("/"))
		.await
		.expect_err("A fresh negotiator should ask for authorization.");

	assert!(err.is_redirect());
}

#[tokio::test]
async fn first_connect_redirects_and_keeps_request_token_in_cache_only() {
	let server = MockServer::start_async().await;
	let token_dir = temp_token_dir("first_connect");
	let harness = build_harness(&server, token_dir.clone());
	let request_mock = mock_request_token(&server).await;
	let err = harness
		.negotiator
		.connect(&HashMap::new(), &page_url("/2012/hello?uncache_key=secret"))
		.await
		.expect_err("Connect without credentials should redirect.");

	request_mock.assert_async().await;

	let Error::AuthorizationRequired { authorize_url } = err else {
		panic!("Expected the redirect signal, got {err:?}.");
	};
	let pairs: HashMap<_, _> = authorize_url.query_pairs().into_owned().collect();

	assert_eq!(authorize_url.path(), "/1/oauth/authorize");
	assert_eq!(pairs.get("oauth_token"), Some(&"req-token".to_owned()));
	assert_eq!(pairs.get("oauth_callback"), Some(&"http://blog.test/2012/hello".to_owned()));
	assert_eq!(
		harness.cache.get("r_token").await.expect("Cache read should succeed."),
		Some("req-token".to_owned())
	);
	assert_eq!(
		harness.cache.get("r_token_secret").await.expect("Cache read should succeed."),
		Some("req-secret".to_owned())
	);
	assert!(!token_dir.exists(), "Request credentials must never reach the durable files.");
	assert_eq!(harness.negotiator.state(), NegotiatorState::Uninitialized);
}

#[tokio::test]
async fn callback_exchange_persists_access_pair_and_erases_request_pair() {
	let server = MockServer::start_async().await;
	let token_dir = temp_token_dir("callback_exchange");
	let harness = build_harness(&server, token_dir.clone());

	mock_request_token(&server).await;
	start_handshake(&harness).await;

	let access_mock = mock_access_token(&server, 200, ACCESS_BODY).await;
	let callback = query(&[("oauth_token", "req-token"), ("uid", "42")]);
	let session = harness
		.negotiator
		.connect(&callback, &page_url("/?oauth_token=req-token&uid=42"))
		.await
		.expect("Callback should complete the handshake.");

	access_mock.assert_async().await;

	assert_eq!(session.credential().token(), "acc-token");
	assert_eq!(session.credential().secret().expose(), "acc-secret");
	assert_eq!(harness.negotiator.state(), NegotiatorState::Authorized);
	assert_eq!(
		harness.cache.get("s_token").await.expect("Cache read should succeed."),
		Some("acc-token".to_owned())
	);
	assert_eq!(
		harness.files.read("s_token").expect("File read should succeed."),
		Some("acc-token".to_owned())
	);
	assert_eq!(
		harness.files.read("s_token_secret").expect("File read should succeed."),
		Some("acc-secret".to_owned())
	);
	assert_eq!(harness.cache.get("r_token").await.expect("Cache read should succeed."), None);
	assert_eq!(harness.cache.get("r_token_secret").await.expect("Cache read should succeed."), None);

	let again = harness
		.negotiator
		.connect(&HashMap::new(), &page_url("/"))
		.await
		.expect("An authorized negotiator should connect without network calls.");

	assert!(Arc::ptr_eq(&session, &again));
	access_mock.assert_hits_async(1).await;

	let _ = std::fs::remove_dir_all(&token_dir);
}

#[tokio::test]
async fn cold_cache_resumes_from_durable_files_without_network() {
	let server = MockServer::start_async().await;
	let token_dir = temp_token_dir("cold_start");
	let harness = build_harness(&server, token_dir.clone());

	seed_access_files(&harness.files, "disk-token", "disk-secret");

	let request_mock = mock_request_token(&server).await;
	let session = harness
		.negotiator
		.connect(&HashMap::new(), &page_url("/"))
		.await
		.expect("Durable credentials should resume the session.");

	request_mock.assert_hits_async(0).await;

	assert_eq!(session.credential().token(), "disk-token");
	assert_eq!(
		harness.cache.get("s_token").await.expect("Cache read should succeed."),
		Some("disk-token".to_owned())
	);

	let _ = std::fs::remove_dir_all(&token_dir);
}

#[tokio::test]
async fn rejected_exchange_surfaces_remote_auth_and_persists_nothing() {
	let server = MockServer::start_async().await;
	let token_dir = temp_token_dir("rejected_exchange");
	let harness = build_harness(&server, token_dir.clone());

	mock_request_token(&server).await;
	start_handshake(&harness).await;
	mock_access_token(&server, 401, "{\"error\": \"Unauthorized\"}").await;

	let err = harness
		.negotiator
		.connect(&query(&[("oauth_token", "req-token")]), &page_url("/?oauth_token=req-token"))
		.await
		.expect_err("A rejected exchange should fail.");

	assert!(matches!(err, Error::RemoteAuth { .. }), "Unexpected error: {err:?}.");
	assert_eq!(harness.negotiator.state(), NegotiatorState::Uninitialized);
	assert_eq!(harness.cache.get("s_token").await.expect("Cache read should succeed."), None);
	assert_eq!(harness.cache.get("r_token").await.expect("Cache read should succeed."), None);
	assert!(!token_dir.exists());
}

#[tokio::test]
async fn visitors_during_authorization_keep_the_pending_request() {
	let server = MockServer::start_async().await;
	let token_dir = temp_token_dir("authorization_window");
	let harness = build_harness(&server, token_dir.clone());
	let request_mock = mock_request_token(&server).await;

	start_handshake(&harness).await;

	let err = harness
		.negotiator
		.connect(&HashMap::new(), &page_url("/articles.xml"))
		.await
		.expect_err("A second visitor should be redirected as well.");
	let Error::AuthorizationRequired { authorize_url } = err else {
		panic!("Expected the redirect signal, got {err:?}.");
	};
	let pairs: HashMap<_, _> = authorize_url.query_pairs().into_owned().collect();

	request_mock.assert_hits_async(1).await;

	assert_eq!(pairs.get("oauth_token"), Some(&"req-token".to_owned()));
	assert_eq!(pairs.get("oauth_callback"), Some(&"http://blog.test/articles.xml".to_owned()));

	let access_mock = mock_access_token(&server, 200, ACCESS_BODY).await;
	let session = harness
		.negotiator
		.connect(&query(&[("oauth_token", "req-token")]), &page_url("/?oauth_token=req-token"))
		.await
		.expect("The first visitor's callback should still authorize.");

	access_mock.assert_async().await;

	assert_eq!(session.credential().token(), "acc-token");

	let _ = std::fs::remove_dir_all(&token_dir);
}

#[tokio::test]
async fn declined_authorization_clears_pending_request() {
	let server = MockServer::start_async().await;
	let harness = build_harness(&server, temp_token_dir("declined"));

	mock_request_token(&server).await;
	start_handshake(&harness).await;

	let err = harness
		.negotiator
		.connect(&query(&[("not_approved", "true")]), &page_url("/?not_approved=true"))
		.await
		.expect_err("A declined authorization should fail.");

	assert!(matches!(err, Error::RemoteAuth { .. }));
	assert_eq!(harness.cache.get("r_token").await.expect("Cache read should succeed."), None);
}

#[tokio::test]
async fn concurrent_callbacks_exchange_once() {
	let server = MockServer::start_async().await;
	let token_dir = temp_token_dir("concurrent");
	let harness = build_harness(&server, token_dir.clone());

	mock_request_token(&server).await;
	start_handshake(&harness).await;

	let access_mock = mock_access_token(&server, 200, ACCESS_BODY).await;
	let callback = query(&[("oauth_token", "req-token")]);
	let url = page_url("/?oauth_token=req-token");
	let (a, b, c) = tokio::join!(
		harness.negotiator.connect(&callback, &url),
		harness.negotiator.connect(&callback, &url),
		harness.negotiator.connect(&callback, &url),
	);
	let a = a.expect("First concurrent connect should succeed.");
	let b = b.expect("Second concurrent connect should succeed.");
	let c = c.expect("Third concurrent connect should succeed.");

	access_mock.assert_hits_async(1).await;

	assert!(Arc::ptr_eq(&a, &b) && Arc::ptr_eq(&b, &c));

	let _ = std::fs::remove_dir_all(&token_dir);
}

#[tokio::test]
async fn invalidate_forgets_persisted_access() {
	let server = MockServer::start_async().await;
	let token_dir = temp_token_dir("invalidate");
	let harness = build_harness(&server, token_dir.clone());

	seed_access_files(&harness.files, "stale-token", "stale-secret");
	harness
		.negotiator
		.connect(&HashMap::new(), &page_url("/"))
		.await
		.expect("Durable credentials should resume the session.");
	harness.negotiator.invalidate().await.expect("Invalidation should succeed.");

	assert_eq!(harness.negotiator.state(), NegotiatorState::Uninitialized);
	assert_eq!(harness.files.read("s_token").expect("File read should succeed."), None);

	let request_mock = mock_request_token(&server).await;

	start_handshake(&harness).await;
	request_mock.assert_async().await;

	let _ = std::fs::remove_dir_all(&token_dir);
}
