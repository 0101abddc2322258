//! OAuth 1.0 PLAINTEXT signing (RFC 5849 §3.4.4) and token-endpoint response parsing.

// crates.io
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::{Credential, Secret},
	error::TransientError,
};

/// RFC 3986 unreserved characters stay literal; everything else is escaped.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');
const NONCE_LEN: usize = 16;

/// Consumer identity attached to every signed request.
#[derive(Clone, Debug)]
pub struct Consumer {
	/// Application key (`oauth_consumer_key`).
	pub key: String,
	/// Application secret; only ever sent inside the PLAINTEXT signature.
	pub secret: Secret,
}
impl Consumer {
	/// Pairs an application key with its secret.
	pub fn new(key: impl Into<String>, secret: Secret) -> Self {
		Self { key: key.into(), secret }
	}

	/// Builds the `Authorization` header value for a request signed with `token`, if any.
	pub fn authorization_header(&self, token: Option<&Credential>) -> String {
		let nonce = random_string(NONCE_LEN);
		let timestamp = OffsetDateTime::now_utc().unix_timestamp().to_string();

		self.authorization_header_with(token, &nonce, &timestamp)
	}

	pub(crate) fn authorization_header_with(
		&self,
		token: Option<&Credential>,
		nonce: &str,
		timestamp: &str,
	) -> String {
		let signature = plaintext_signature(&self.secret, token.map(|credential| &credential.secret));
		let mut params = vec![
			("oauth_consumer_key", self.key.as_str()),
			("oauth_nonce", nonce),
			("oauth_signature_method", "PLAINTEXT"),
			("oauth_timestamp", timestamp),
			("oauth_version", "1.0"),
		];

		if let Some(credential) = token {
			params.push(("oauth_token", credential.token.as_str()));
		}

		params.push(("oauth_signature", signature.as_str()));

		let rendered = params
			.into_iter()
			.map(|(name, value)| format!("{name}=\"{}\"", encode(value)))
			.collect::<Vec<_>>()
			.join(", ");

		format!("OAuth {rendered}")
	}
}

/// `encode(consumer_secret) & encode(token_secret)`, with an empty token secret when unsigned.
pub fn plaintext_signature(consumer_secret: &Secret, token_secret: Option<&Secret>) -> String {
	let token_part = token_secret.map(|secret| encode(secret.expose())).unwrap_or_default();

	format!("{}&{token_part}", encode(consumer_secret.expose()))
}

/// Parses an `oauth_token=...&oauth_token_secret=...` form body.
pub fn parse_token_response(body: &[u8]) -> Result<Credential, TransientError> {
	let mut token = None;
	let mut secret = None;

	for (name, value) in url::form_urlencoded::parse(body) {
		match name.as_ref() {
			"oauth_token" => token = Some(value.into_owned()),
			"oauth_token_secret" => secret = Some(value.into_owned()),
			_ => {},
		}
	}

	let token = token
		.filter(|value| !value.is_empty())
		.ok_or(TransientError::MissingTokenField { field: "oauth_token" })?;
	let secret = secret
		.filter(|value| !value.is_empty())
		.ok_or(TransientError::MissingTokenField { field: "oauth_token_secret" })?;

	Ok(Credential::new(token, secret))
}

fn encode(value: &str) -> String {
	utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}
