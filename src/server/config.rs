//! Process configuration read from the environment (and an optional `.env` file).

// std
use std::{
	env,
	net::{IpAddr, SocketAddr},
	path::PathBuf,
};
// self
use crate::{_prelude::*, auth::Secret, error::ConfigError, remote::AccessType};

const APP_KEY: &str = "DROPBOX_APP_KEY";
const APP_SECRET: &str = "DROPBOX_APP_SECRET";
const ACCESS_TYPE: &str = "DROPBOX_ACCESS_TYPE";
const UNCACHE_KEY: &str = "UNCACHE_KEY";
const HOST: &str = "MARKBOX_HOST";
const PORT: &str = "MARKBOX_PORT";
const BLOG_TITLE: &str = "MARKBOX_BLOG_TITLE";
const FEED_NAME: &str = "MARKBOX_FEED_NAME";
const FEED_AUTHOR: &str = "MARKBOX_FEED_AUTHOR";
const PUBLIC_FOLDER: &str = "MARKBOX_PUBLIC_FOLDER";
const TOKEN_DIR: &str = "MARKBOX_TOKEN_DIR";
const MEMCACHE_SERVERS: &str = "MEMCACHE_SERVERS";

/// Merges a `.env` file from the working directory (or a parent) into the environment.
///
/// Variables already set win. Returns the file that was loaded, if any.
pub fn load_dotenv() -> Result<Option<PathBuf>, dotenvy::Error> {
	match dotenvy::dotenv() {
		Ok(path) => Ok(Some(path)),
		Err(e) if e.not_found() => Ok(None),
		Err(e) => Err(e),
	}
}

/// Presentation settings shared by every rendered page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlogSettings {
	/// Site title.
	pub title: String,
	/// Feed file stem; the feed is served at `/{feed_name}.xml`.
	pub feed_name: String,
	/// Author attached to the feed and its entries.
	pub feed_author: String,
}
impl BlogSettings {
	/// Route path of the Atom feed.
	pub fn feed_path(&self) -> String {
		format!("/{}.xml", self.feed_name)
	}
}
impl Default for BlogSettings {
	fn default() -> Self {
		Self {
			title: "Your New Markbox Blog".into(),
			feed_name: "articles".into(),
			feed_author: "Anonymous".into(),
		}
	}
}

/// Everything the binary needs to start serving.
#[derive(Clone, Debug)]
pub struct ServerConfig {
	/// Remote application key.
	pub app_key: String,
	/// Remote application secret.
	pub app_secret: Secret,
	/// Part of the account the key was granted.
	pub access_type: AccessType,
	/// Secret enabling `uncache_key` invalidation; `None` disables it.
	pub uncache_key: Option<Secret>,
	/// Listen address.
	pub host: IpAddr,
	/// Listen port.
	pub port: u16,
	/// Presentation settings.
	pub blog: BlogSettings,
	/// Folder served under `/{basename}`.
	pub public_folder: PathBuf,
	/// Folder holding the durable access credential files.
	pub token_dir: PathBuf,
}
impl ServerConfig {
	/// Reads the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| env::var(name).ok())
	}

	/// Builds a configuration from an arbitrary variable lookup.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
		let var = |name: &str| lookup(name).map(|value| value.trim().to_owned()).filter(|v| !v.is_empty());
		let required = |name: &'static str| var(name).ok_or(ConfigError::MissingEnv { name });
		let app_key = required(APP_KEY)?;
		let app_secret = Secret::new(required(APP_SECRET)?);
		let access_type = match var(ACCESS_TYPE) {
			Some(raw) => raw.parse()?,
			None => AccessType::default(),
		};
		let uncache_key = var(UNCACHE_KEY).map(Secret::new);

		if uncache_key.is_none() {
			tracing::warn!("{UNCACHE_KEY} is not set; cache invalidation requests will be ignored.");
		}
		if var(MEMCACHE_SERVERS).is_some() {
			tracing::warn!("{MEMCACHE_SERVERS} is set but unsupported; using the in-process cache.");
		}

		let host = parse_or(&var, HOST, IpAddr::from([0, 0, 0, 0]))?;
		let port = parse_or(&var, PORT, 8080_u16)?;
		let defaults = BlogSettings::default();
		let blog = BlogSettings {
			title: var(BLOG_TITLE).unwrap_or(defaults.title),
			feed_name: var(FEED_NAME)
				.map(|name| name.trim_matches('/').to_owned())
				.unwrap_or(defaults.feed_name),
			feed_author: var(FEED_AUTHOR).unwrap_or(defaults.feed_author),
		};

		if blog.feed_name.is_empty() || blog.feed_name.contains(['/', '{', '}', '*']) {
			return Err(ConfigError::InvalidEnv { name: FEED_NAME, value: blog.feed_name });
		}

		Ok(Self {
			app_key,
			app_secret,
			access_type,
			uncache_key,
			host,
			port,
			blog,
			public_folder: var(PUBLIC_FOLDER).unwrap_or_else(|| "public".into()).into(),
			token_dir: var(TOKEN_DIR).unwrap_or_else(|| ".".into()).into(),
		})
	}

	/// Socket address to bind.
	pub fn bind_addr(&self) -> SocketAddr {
		SocketAddr::new(self.host, self.port)
	}
}

fn parse_or<T>(
	var: &impl Fn(&str) -> Option<String>,
	name: &'static str,
	default: T,
) -> Result<T, ConfigError>
where
	T: FromStr,
{
	match var(name) {
		Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidEnv { name, value: raw }),
		None => Ok(default),
	}
}
