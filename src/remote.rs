//! Remote storage contract (data) and the reqwest-backed Dropbox-style client (behavior).
//!
//! `descriptor` holds the validated endpoint set, `oauth1` the PLAINTEXT request signing and
//! token-response parsing, and `dropbox` the [`RemoteService`] implementation used in production.

pub mod descriptor;
#[cfg(feature = "reqwest")] pub mod dropbox;
pub mod oauth1;

pub use descriptor::*;
#[cfg(feature = "reqwest")] pub use dropbox::*;

// self
use crate::{
	_prelude::*,
	auth::{AccessCredential, RequestCredential},
	error::TransientError,
};

/// Boxed future returned by [`RemoteService`] operations.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Operations the blog needs from the remote storage account.
///
/// The handshake methods work without an access credential; the content methods take the bound
/// session credential explicitly so one service value can be shared by every request.
pub trait RemoteService
where
	Self: Send + Sync,
{
	/// Asks the remote service for a fresh request credential.
	fn obtain_request_token(&self) -> RemoteFuture<'_, RequestCredential>;

	/// Exchanges an authorized request credential for an access credential.
	fn obtain_access_token<'a>(
		&'a self,
		request: &'a RequestCredential,
	) -> RemoteFuture<'a, AccessCredential>;

	/// Builds the page the user must visit to authorize `request`, returning to `callback`.
	fn build_authorize_url(&self, request: &RequestCredential, callback: &Url) -> Url;

	/// Lists every file under `root` whose name matches `suffix`.
	fn search<'a>(
		&'a self,
		session: &'a AccessCredential,
		root: &'a str,
		suffix: &'a str,
	) -> RemoteFuture<'a, Vec<RemoteEntry>>;

	/// Fetches the raw bytes of the file at `path`.
	fn get_file<'a>(
		&'a self,
		session: &'a AccessCredential,
		path: &'a str,
	) -> RemoteFuture<'a, Vec<u8>>;
}

/// File descriptor returned by [`RemoteService::search`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
	/// Absolute remote path, with its leading separator.
	pub path: String,
	/// Directory entries can match a name search too.
	#[serde(default)]
	pub is_dir: bool,
}
impl RemoteEntry {
	/// Builds a file entry for `path`.
	pub fn file(path: impl Into<String>) -> Self {
		Self { path: path.into(), is_dir: false }
	}
}

/// Which remote call produced a failure; drives status classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteCall {
	/// Request-token issuance.
	RequestToken,
	/// Access-token exchange.
	AccessToken,
	/// Name search under a folder.
	Search,
	/// Raw file download.
	GetFile,
}
impl RemoteCall {
	/// Returns a stable label suitable for span or log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RemoteCall::RequestToken => "request_token",
			RemoteCall::AccessToken => "access_token",
			RemoteCall::Search => "search",
			RemoteCall::GetFile => "get_file",
		}
	}

	const fn is_handshake(self) -> bool {
		matches!(self, RemoteCall::RequestToken | RemoteCall::AccessToken)
	}
}
impl Display for RemoteCall {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Maps a non-success remote answer into the crate error taxonomy.
///
/// - 404 on content calls → [`Error::NotFound`].
/// - 401/403, and any 4xx from a handshake endpoint → [`Error::RemoteAuth`].
/// - 429 and 5xx → [`TransientError::Unavailable`] carrying the Retry-After hint.
/// - everything else → [`Error::Remote`].
pub fn classify_failure(
	call: RemoteCall,
	path: &str,
	status: u16,
	retry_after: Option<Duration>,
	body_preview: String,
) -> Error {
	match status {
		404 if !call.is_handshake() => Error::NotFound { path: path.to_owned() },
		401 | 403 => Error::RemoteAuth { reason: auth_reason(call, status, &body_preview) },
		400..=499 if call.is_handshake() =>
			Error::RemoteAuth { reason: auth_reason(call, status, &body_preview) },
		429 | 500..=599 => TransientError::Unavailable {
			message: format!("{call} call returned HTTP {status}"),
			status: Some(status),
			retry_after,
		}
		.into(),
		_ => Error::Remote { status, message: body_preview },
	}
}

fn auth_reason(call: RemoteCall, status: u16, body_preview: &str) -> String {
	if body_preview.trim().is_empty() {
		format!("{call} call returned HTTP {status}")
	} else {
		format!("{call} call returned HTTP {status} ({})", body_preview.trim())
	}
}
