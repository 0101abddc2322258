//! Crate-level error types shared by the session negotiator, the remote client, and the stores.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; a later request may succeed.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// No session exists yet; the caller must redirect the user to `authorize_url`.
	///
	/// This is a control-flow signal rather than a failure. It has to reach the transport layer
	/// untouched, which answers with an HTTP redirect.
	#[error("Authorization required; redirecting to {authorize_url}.")]
	AuthorizationRequired {
		/// Remote authorization page carrying the callback back to the current request.
		authorize_url: Url,
	},
	/// Request-token issuance or the access-token exchange was rejected.
	#[error("Remote service rejected the credentials: {reason}.")]
	RemoteAuth {
		/// Remote- or client-supplied reason string.
		reason: String,
	},
	/// The requested remote file does not exist.
	#[error("Remote file `{path}` was not found.")]
	NotFound {
		/// Remote path that was requested.
		path: String,
	},
	/// Any other non-success answer from the remote service.
	#[error("Remote service returned HTTP {status}: {message}.")]
	Remote {
		/// HTTP status code.
		status: u16,
		/// Body preview or summary.
		message: String,
	},
}
impl Error {
	/// Returns `true` for the redirect signal raised by an unauthenticated connect.
	pub fn is_redirect(&self) -> bool {
		matches!(self, Self::AuthorizationRequired { .. })
	}

	/// Returns `true` when the remote file was missing.
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound { .. })
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A required environment variable is absent.
	#[error("Environment variable `{name}` is not set.")]
	MissingEnv {
		/// Variable name.
		name: &'static str,
	},
	/// An environment variable is present but cannot be parsed.
	#[error("Environment variable `{name}` has an invalid value: {value}.")]
	InvalidEnv {
		/// Variable name.
		name: &'static str,
		/// Offending raw value.
		value: String,
	},
	/// A URL derived from configuration or the current request cannot be parsed.
	#[error("URL `{url}` is invalid.")]
	InvalidUrl {
		/// Raw URL text.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Remote descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::remote::ServiceDescriptorError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Temporary failure variants.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Remote service answered with a throttling or server-side status.
	#[error("Remote service is temporarily unavailable: {message}.")]
	Unavailable {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Remote service responded with a malformed payload.
	#[error("Remote service returned a malformed payload.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// A token endpoint answered without the expected form fields.
	#[error("Token endpoint response is missing `{field}`.")]
	MissingTokenField {
		/// Missing form field.
		field: &'static str,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the remote service.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the remote service.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for Error {
	fn from(e: ReqwestError) -> Self {
		if e.is_builder() {
			ConfigError::http_client_build(e).into()
		} else if e.is_timeout() {
			TransientError::Unavailable {
				message: "Request timed out while calling the remote service".into(),
				status: e.status().map(|code| code.as_u16()),
				retry_after: None,
			}
			.into()
		} else {
			TransportError::from(e).into()
		}
	}
}
