//! Transport primitives for calls to the remote storage service.
//!
//! [`ReqwestHttpClient`] owns the shared reqwest client; [`dispatch`] sends a prepared request and
//! captures the [`ResponseMetadata`] the remote layer needs to classify failures (status code and
//! any Retry-After hint) alongside the raw body.

// std
use std::ops::Deref;
// crates.io
use reqwest::{
	RequestBuilder,
	header::{HeaderMap, RETRY_AFTER},
	redirect::Policy,
};
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::ConfigError};

const BODY_PREVIEW_LIMIT: usize = 256;

/// Status and retry hints captured from the most recent remote response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the remote service.
	pub status: Option<u16>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}
impl ResponseMetadata {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		matches!(self.status, Some(200..=299))
	}
}

/// Response body plus the metadata captured while receiving it.
#[derive(Clone, Debug)]
pub struct RemoteResponse {
	/// Status and retry hints.
	pub meta: ResponseMetadata,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl RemoteResponse {
	/// Lossy UTF-8 preview of the body, truncated for error messages.
	pub fn body_preview(&self) -> String {
		truncate_preview(String::from_utf8_lossy(&self.body).into_owned())
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Remote API calls never follow redirects; an unexpected 3xx is surfaced as a remote error
/// instead of silently hopping hosts with signed headers attached.
#[derive(Clone)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Builds the default client with redirect following disabled.
	pub fn new() -> Result<Self> {
		let client = ReqwestClient::builder()
			.redirect(Policy::none())
			.build()
			.map_err(ConfigError::http_client_build)?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl Debug for ReqwestHttpClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ReqwestHttpClient(..)")
	}
}

/// Sends `request` and buffers the response, whatever its status.
pub async fn dispatch(request: RequestBuilder) -> Result<RemoteResponse> {
	let response = request.send().await?;
	let status = response.status();
	let retry_after = parse_retry_after(response.headers());
	let meta = ResponseMetadata { status: Some(status.as_u16()), retry_after };
	let body = response.bytes().await?.to_vec();

	Ok(RemoteResponse { meta, body })
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<i64>() {
		return Some(Duration::seconds(secs));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

fn truncate_preview(mut body: String) -> String {
	if body.len() > BODY_PREVIEW_LIMIT {
		let mut cut = BODY_PREVIEW_LIMIT;

		while !body.is_char_boundary(cut) {
			cut -= 1;
		}

		body.truncate(cut);
	}

	body
}
