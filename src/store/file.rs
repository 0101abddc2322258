//! Flat-file fallback for the access credential, one file per field.
//!
//! Each field lives in a dot-file named after its cache key (`.s_token`, `.s_token_secret`) so a
//! restarted process with a cold cache can still resume the authorized session.

// std
use std::{
	fs::{self, File},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{_prelude::*, store::StoreError};

/// Directory-backed store writing one flat file per key.
#[derive(Clone, Debug)]
pub struct DurableFiles {
	dir: PathBuf,
}
impl DurableFiles {
	/// Uses `dir` (usually the working directory) for every field file.
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	/// Directory holding the field files.
	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Path of the file backing `key`.
	pub fn path_for(&self, key: &str) -> PathBuf {
		self.dir.join(format!(".{key}"))
	}

	/// Reads the file backing `key`; a missing or blank file reads as `None`.
	pub fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
		let path = self.path_for(key);

		match fs::read_to_string(&path) {
			Ok(contents) => {
				let value = contents.trim_end_matches(['\r', '\n']);

				Ok((!value.is_empty()).then(|| value.to_owned()))
			},
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
			Err(e) => Err(StoreError::Backend {
				message: format!("Failed to read {}: {e}", path.display()),
			}),
		}
	}

	/// Atomically replaces the file backing `key` with `value`.
	pub fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
		self.ensure_dir_exists()?;

		let path = self.path_for(key);
		let mut tmp_path = path.clone().into_os_string();

		tmp_path.push(".tmp");

		let tmp_path = PathBuf::from(tmp_path);

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(value.as_bytes()).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", path.display()),
		})
	}

	/// Removes the file backing `key`, ignoring a file that is already gone.
	pub fn remove(&self, key: &str) -> Result<(), StoreError> {
		let path = self.path_for(key);

		match fs::remove_file(&path) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StoreError::Backend {
				message: format!("Failed to remove {}: {e}", path.display()),
			}),
		}
	}

	fn ensure_dir_exists(&self) -> Result<(), StoreError> {
		if self.dir.as_os_str().is_empty() {
			return Ok(());
		}

		fs::create_dir_all(&self.dir).map_err(|e| StoreError::Backend {
			message: format!("Failed to create token directory {}: {e}", self.dir.display()),
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	fn temp_dir() -> PathBuf {
		let unique = format!(
			"markbox_durable_files_{}_{}",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn write_and_reread_field() {
		let dir = temp_dir();
		let files = DurableFiles::new(&dir);

		files.write("s_token", "token-abc").expect("Writing the token file should succeed.");

		assert_eq!(files.path_for("s_token"), dir.join(".s_token"));
		assert_eq!(
			files.read("s_token").expect("Reading the token file should succeed.").as_deref(),
			Some("token-abc")
		);

		drop(files);

		let reopened = DurableFiles::new(&dir);

		assert_eq!(
			reopened.read("s_token").expect("Reading after reopen should succeed.").as_deref(),
			Some("token-abc")
		);

		fs::remove_dir_all(&dir).unwrap_or_else(|e| {
			panic!("Failed to remove temporary token directory {}: {e}", dir.display())
		});
	}

	#[test]
	fn missing_and_blank_files_read_as_absent() {
		let dir = temp_dir();
		let files = DurableFiles::new(&dir);

		assert_eq!(files.read("s_token_secret").expect("Missing file should not error."), None);

		files.write("s_token_secret", "\n").expect("Writing a blank file should succeed.");

		assert_eq!(files.read("s_token_secret").expect("Blank file should not error."), None);

		files.remove("s_token_secret").expect("Removing the file should succeed.");
		files.remove("s_token_secret").expect("Removing twice should succeed.");

		fs::remove_dir_all(&dir).unwrap_or_else(|e| {
			panic!("Failed to remove temporary token directory {}: {e}", dir.display())
		});
	}
}
