//! Thread-safe in-process [`CacheBackend`], used when no external cache is configured.

// self
use crate::{
	_prelude::*,
	store::{CacheBackend, StoreError, StoreFuture},
};

type CacheMap = Arc<RwLock<HashMap<String, String>>>;

/// Cache backend that keeps every entry in process memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache(CacheMap);
impl MemoryCache {
	/// Number of entries currently held.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Drops every entry, simulating an evicted or restarted cache.
	pub fn clear(&self) {
		self.0.write().clear();
	}

	fn get_now(map: CacheMap, key: &str) -> Option<String> {
		map.read().get(key).cloned()
	}

	fn set_now(map: CacheMap, key: &str, value: String) -> Result<(), StoreError> {
		map.write().insert(key.to_owned(), value);

		Ok(())
	}

	fn delete_now(map: CacheMap, key: &str) -> Result<(), StoreError> {
		map.write().remove(key);

		Ok(())
	}
}
impl CacheBackend for MemoryCache {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::get_now(map, key)) })
	}

	fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::set_now(map, key, value) })
	}

	fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::delete_now(map, key) })
	}
}
