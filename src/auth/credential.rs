//! Token/secret pairs produced by the OAuth 1.0 handshake.
//!
//! Two kinds exist. A [`RequestCredential`] only lives between the start of the handshake and
//! the callback, so it is kept in the fast cache alone. An [`AccessCredential`] authorizes every
//! later call and is persisted to both the cache and the durable files.

// self
use crate::{_prelude::*, auth::Secret};

/// Distinguishes the short-lived handshake pair from the long-lived session pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CredentialKind {
	/// Issued by the request-token endpoint; erased after the exchange.
	Request,
	/// Issued by the access-token endpoint; reused for the process lifetime.
	Access,
}
impl CredentialKind {
	/// Cache key holding the token half.
	pub const fn token_key(self) -> &'static str {
		match self {
			CredentialKind::Request => "r_token",
			CredentialKind::Access => "s_token",
		}
	}

	/// Cache key holding the secret half.
	pub const fn secret_key(self) -> &'static str {
		match self {
			CredentialKind::Request => "r_token_secret",
			CredentialKind::Access => "s_token_secret",
		}
	}

	/// Whether the pair is mirrored to durable files.
	pub const fn is_durable(self) -> bool {
		matches!(self, CredentialKind::Access)
	}

	/// Returns a stable label suitable for span or log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CredentialKind::Request => "request",
			CredentialKind::Access => "access",
		}
	}
}
impl Display for CredentialKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Raw token/secret pair shared by both credential kinds.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
	/// Public token half (`oauth_token`).
	pub token: String,
	/// Secret half (`oauth_token_secret`).
	pub secret: Secret,
}
impl Credential {
	/// Builds a pair from its two halves.
	pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
		Self { token: token.into(), secret: Secret::new(secret) }
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("token", &self.token)
			.field("secret", &self.secret)
			.finish()
	}
}

macro_rules! def_credential {
	($name:ident, $kind:expr, $doc:literal) => {
		#[doc = $doc]
		#[derive(Clone, Debug, PartialEq, Eq)]
		pub struct $name(Credential);
		impl $name {
			/// Kind tag used to pick cache keys and durability.
			pub const KIND: CredentialKind = $kind;

			/// Builds the credential from its two halves.
			pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
				Self(Credential::new(token, secret))
			}

			/// Public token half.
			pub fn token(&self) -> &str {
				&self.0.token
			}

			/// Secret half.
			pub fn secret(&self) -> &Secret {
				&self.0.secret
			}

			/// Unwraps the raw pair.
			pub fn into_inner(self) -> Credential {
				self.0
			}
		}
		impl From<Credential> for $name {
			fn from(value: Credential) -> Self {
				Self(value)
			}
		}
		impl AsRef<Credential> for $name {
			fn as_ref(&self) -> &Credential {
				&self.0
			}
		}
	};
}

def_credential!(
	RequestCredential,
	CredentialKind::Request,
	"Short-lived pair used only during the authorization handshake."
);
def_credential!(
	AccessCredential,
	CredentialKind::Access,
	"Long-lived pair authorizing every call to the remote storage account."
);
