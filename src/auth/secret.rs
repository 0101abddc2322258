//! Redacting wrapper for token secrets and app secrets.

// self
use crate::_prelude::*;

/// Secret string that never shows up in `Debug` or `Display` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);
impl Secret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the wrapped value is empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Constant-shape comparison against a caller-supplied candidate.
	///
	/// Every byte is inspected even after a mismatch.
	pub fn matches(&self, candidate: &str) -> bool {
		let expected = self.0.as_bytes();
		let candidate = candidate.as_bytes();

		if expected.len() != candidate.len() {
			return false;
		}

		expected.iter().zip(candidate).fold(0_u8, |acc, (a, b)| acc | (a ^ b)) == 0
	}
}
impl From<String> for Secret {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Secret").field(&"<redacted>").finish()
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
