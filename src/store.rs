//! Key-value cache contract plus the credential persistence built on top of it.

pub mod file;
pub mod memory;
pub mod token;

pub use file::DurableFiles;
pub use memory::MemoryCache;
pub use token::TokenStore;

// self
use crate::_prelude::*;

/// Boxed future returned by [`CacheBackend`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Fast key-value cache shared by the token store and the render cache.
///
/// Implementations must be safe for concurrent use; callers layer no locking on top.
pub trait CacheBackend
where
	Self: Send + Sync,
{
	/// Returns the value stored under `key`, if any.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Stores or replaces the value under `key`.
	fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()>;

	/// Removes `key`; deleting a missing key is not an error.
	fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`CacheBackend`] implementations and [`DurableFiles`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
