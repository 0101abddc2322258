//! Reqwest-backed [`RemoteService`] speaking the Dropbox v1 REST dialect.

// crates.io
use reqwest::header::AUTHORIZATION;
// self
use crate::{
	_prelude::*,
	auth::{AccessCredential, Credential, RequestCredential, Secret},
	error::TransientError,
	http::{self, ReqwestHttpClient, RemoteResponse},
	remote::{
		RemoteCall, RemoteEntry, RemoteFuture, RemoteService, ServiceDescriptor, classify_failure,
		oauth1::{self, Consumer},
	},
};

/// Remote storage client bound to one application key.
#[derive(Clone, Debug)]
pub struct DropboxService {
	descriptor: ServiceDescriptor,
	consumer: Consumer,
	http_client: ReqwestHttpClient,
}
impl DropboxService {
	/// Creates a client with its own reqwest transport.
	pub fn new(
		descriptor: ServiceDescriptor,
		app_key: impl Into<String>,
		app_secret: Secret,
	) -> Result<Self> {
		Ok(Self::with_http_client(descriptor, app_key, app_secret, ReqwestHttpClient::new()?))
	}

	/// Creates a client that reuses the caller-provided transport.
	pub fn with_http_client(
		descriptor: ServiceDescriptor,
		app_key: impl Into<String>,
		app_secret: Secret,
		http_client: ReqwestHttpClient,
	) -> Self {
		Self { descriptor, consumer: Consumer::new(app_key, app_secret), http_client }
	}

	/// Endpoint set in use.
	pub fn descriptor(&self) -> &ServiceDescriptor {
		&self.descriptor
	}

	async fn token_call(&self, call: RemoteCall, url: Url, token: Option<&Credential>) -> Result<Credential> {
		let request = self
			.http_client
			.post(url)
			.header(AUTHORIZATION, self.consumer.authorization_header(token));
		let response = expect_success(call, "", http::dispatch(request).await?)?;

		Ok(oauth1::parse_token_response(&response.body)?)
	}
}
impl RemoteService for DropboxService {
	fn obtain_request_token(&self) -> RemoteFuture<'_, RequestCredential> {
		Box::pin(async move {
			let url = self.descriptor.request_token_url();
			let credential = self.token_call(RemoteCall::RequestToken, url, None).await?;

			Ok(RequestCredential::from(credential))
		})
	}

	fn obtain_access_token<'a>(
		&'a self,
		request: &'a RequestCredential,
	) -> RemoteFuture<'a, AccessCredential> {
		Box::pin(async move {
			let url = self.descriptor.access_token_url();
			let credential =
				self.token_call(RemoteCall::AccessToken, url, Some(request.as_ref())).await?;

			Ok(AccessCredential::from(credential))
		})
	}

	fn build_authorize_url(&self, request: &RequestCredential, callback: &Url) -> Url {
		let mut url = self.descriptor.authorize_url();

		url.query_pairs_mut()
			.append_pair("oauth_token", request.token())
			.append_pair("oauth_callback", callback.as_str());

		url
	}

	fn search<'a>(
		&'a self,
		session: &'a AccessCredential,
		root: &'a str,
		suffix: &'a str,
	) -> RemoteFuture<'a, Vec<RemoteEntry>> {
		Box::pin(async move {
			let mut url = self.descriptor.search_url(root);

			url.query_pairs_mut().append_pair("query", suffix);

			let request = self
				.http_client
				.get(url)
				.header(AUTHORIZATION, self.consumer.authorization_header(Some(session.as_ref())));
			let response = expect_success(RemoteCall::Search, root, http::dispatch(request).await?)?;
			let status = response.meta.status;
			let mut deserializer = serde_json::Deserializer::from_slice(&response.body);
			let entries: Vec<RemoteEntry> = serde_path_to_error::deserialize(&mut deserializer)
				.map_err(|source| TransientError::ResponseParse { source, status })?;

			Ok(entries)
		})
	}

	fn get_file<'a>(
		&'a self,
		session: &'a AccessCredential,
		path: &'a str,
	) -> RemoteFuture<'a, Vec<u8>> {
		Box::pin(async move {
			let request = self
				.http_client
				.get(self.descriptor.file_url(path))
				.header(AUTHORIZATION, self.consumer.authorization_header(Some(session.as_ref())));
			let response = expect_success(RemoteCall::GetFile, path, http::dispatch(request).await?)?;

			Ok(response.body)
		})
	}
}

fn expect_success(call: RemoteCall, path: &str, response: RemoteResponse) -> Result<RemoteResponse> {
	if response.meta.is_success() {
		return Ok(response);
	}

	let status = response.meta.status.unwrap_or_default();

	tracing::debug!(call = call.as_str(), status, "Remote call failed.");

	Err(classify_failure(call, path, status, response.meta.retry_after, response.body_preview()))
}
