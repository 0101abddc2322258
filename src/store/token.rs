//! Credential persistence over the fast cache with a durable-file fallback.
//!
//! The store is passive: it never decides when credentials change, it only mirrors what the
//! session negotiator hands it. Access-credential fields are written to the cache and to
//! [`DurableFiles`]; request-credential fields stay in the cache only.

// self
use crate::{
	_prelude::*,
	auth::{AccessCredential, CredentialKind, RequestCredential},
	store::{CacheBackend, DurableFiles, StoreError},
};

const DURABLE_KEYS: [&str; 2] =
	[CredentialKind::Access.token_key(), CredentialKind::Access.secret_key()];

/// Persists handshake and session credentials across requests and restarts.
#[derive(Clone)]
pub struct TokenStore {
	cache: Arc<dyn CacheBackend>,
	files: DurableFiles,
}
impl TokenStore {
	/// Combines a fast cache with the durable fallback files.
	pub fn new(cache: Arc<dyn CacheBackend>, files: DurableFiles) -> Self {
		Self { cache, files }
	}

	/// Durable fallback in use.
	pub fn files(&self) -> &DurableFiles {
		&self.files
	}

	/// Returns `true` for the fields that are mirrored to durable files.
	pub fn is_durable_key(key: &str) -> bool {
		DURABLE_KEYS.contains(&key)
	}

	/// Looks `key` up in the cache, falling back to the durable file for access-credential fields.
	///
	/// A value recovered from a file is written back to the cache so later lookups stay fast.
	pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		if let Some(value) = self.cache.get(key).await? {
			return Ok(Some(value));
		}
		if !Self::is_durable_key(key) {
			return Ok(None);
		}

		let recovered = self.files.read(key)?;

		if let Some(value) = &recovered {
			tracing::debug!(key, "Recovered credential field from durable file.");

			self.cache.set(key, value.clone()).await?;
		}

		Ok(recovered)
	}

	/// Writes `key` to the cache, and to its durable file for access-credential fields.
	pub async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
		if Self::is_durable_key(key) {
			self.files.write(key, value)?;
		}

		self.cache.set(key, value.to_owned()).await
	}

	/// Removes `key` from the cache. Durable files are left alone.
	pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
		self.cache.delete(key).await
	}

	/// Loads the persisted access credential; both halves must be present.
	pub async fn load_access(&self) -> Result<Option<AccessCredential>, StoreError> {
		let kind = AccessCredential::KIND;
		let token = self.get(kind.token_key()).await?;
		let secret = self.get(kind.secret_key()).await?;

		Ok(token.zip(secret).map(|(token, secret)| AccessCredential::new(token, secret)))
	}

	/// Persists an access credential to the cache and the durable files.
	pub async fn save_access(&self, credential: &AccessCredential) -> Result<(), StoreError> {
		let kind = AccessCredential::KIND;

		self.set(kind.token_key(), credential.token()).await?;
		self.set(kind.secret_key(), credential.secret().expose()).await
	}

	/// Removes the access credential from the cache and the durable files.
	pub async fn forget_access(&self) -> Result<(), StoreError> {
		for key in DURABLE_KEYS {
			self.cache.delete(key).await?;
			self.files.remove(key)?;
		}

		Ok(())
	}

	/// Loads the in-flight request credential, if the handshake was started.
	pub async fn load_request(&self) -> Result<Option<RequestCredential>, StoreError> {
		let kind = RequestCredential::KIND;
		let token = self.get(kind.token_key()).await?;
		let secret = self.get(kind.secret_key()).await?;

		Ok(token.zip(secret).map(|(token, secret)| RequestCredential::new(token, secret)))
	}

	/// Stores the request credential in the cache only.
	pub async fn save_request(&self, credential: &RequestCredential) -> Result<(), StoreError> {
		let kind = RequestCredential::KIND;

		self.set(kind.token_key(), credential.token()).await?;
		self.set(kind.secret_key(), credential.secret().expose()).await
	}

	/// Erases the request credential once it has been exchanged.
	pub async fn clear_request(&self) -> Result<(), StoreError> {
		let kind = RequestCredential::KIND;

		self.delete(kind.token_key()).await?;
		self.delete(kind.secret_key()).await
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenStore").field("files", &self.files).finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{
		env, fs,
		path::{Path, PathBuf},
		process,
	};
	// self
	use super::*;
	use crate::store::MemoryCache;

	fn temp_dir() -> PathBuf {
		let unique = format!(
			"markbox_token_store_{}_{}",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	fn build_store(dir: &Path) -> (TokenStore, Arc<MemoryCache>) {
		let cache = Arc::new(MemoryCache::default());
		let store = TokenStore::new(cache.clone(), DurableFiles::new(dir));

		(store, cache)
	}

	#[tokio::test]
	async fn access_credential_survives_cold_cache() {
		let dir = temp_dir();
		let (store, cache) = build_store(&dir);
		let credential = AccessCredential::new("s-token", "s-secret");

		store.save_access(&credential).await.expect("Saving the access credential should succeed.");
		cache.clear();

		let loaded = store
			.load_access()
			.await
			.expect("Loading from durable files should succeed.")
			.expect("Durable files should still hold the access credential.");

		assert_eq!(loaded, credential);
		assert_eq!(
			cache.get("s_token").await.expect("Cache read should succeed.").as_deref(),
			Some("s-token"),
			"Recovered fields should warm the cache again."
		);

		fs::remove_dir_all(&dir).expect("Failed to remove temporary token directory.");
	}

	#[tokio::test]
	async fn request_credential_is_cache_only() {
		let dir = temp_dir();
		let (store, cache) = build_store(&dir);
		let credential = RequestCredential::new("r-token", "r-secret");

		store.save_request(&credential).await.expect("Saving the request credential should succeed.");

		assert!(!store.files().path_for("r_token").exists());
		assert_eq!(
			store.load_request().await.expect("Loading should succeed."),
			Some(credential.clone())
		);

		cache.clear();

		assert_eq!(store.load_request().await.expect("Loading should succeed."), None);

		store.save_request(&credential).await.expect("Saving again should succeed.");
		store.clear_request().await.expect("Clearing should succeed.");

		assert_eq!(store.load_request().await.expect("Loading should succeed."), None);
	}

	#[tokio::test]
	async fn forgetting_access_clears_cache_and_files() {
		let dir = temp_dir();
		let (store, cache) = build_store(&dir);

		store
			.save_access(&AccessCredential::new("s-token", "s-secret"))
			.await
			.expect("Saving the access credential should succeed.");
		store.forget_access().await.expect("Forgetting the access credential should succeed.");

		assert!(cache.is_empty());
		assert!(!store.files().path_for("s_token").exists());
		assert_eq!(store.load_access().await.expect("Loading should succeed."), None);

		fs::remove_dir_all(&dir).expect("Failed to remove temporary token directory.");
	}

	#[tokio::test]
	async fn half_a_pair_is_not_a_credential() {
		let dir = temp_dir();
		let (store, _cache) = build_store(&dir);

		store.set("s_token", "only-token").await.expect("Setting one field should succeed.");

		assert_eq!(store.load_access().await.expect("Loading should succeed."), None);

		fs::remove_dir_all(&dir).expect("Failed to remove temporary token directory.");
	}
}
