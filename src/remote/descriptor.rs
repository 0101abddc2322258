//! Validated endpoint set for the remote storage service.

// self
use crate::_prelude::*;

const DEFAULT_API: &str = "https://api.dropbox.com/";
const DEFAULT_CONTENT: &str = "https://api-content.dropbox.com/";
const DEFAULT_WEB: &str = "https://www.dropbox.com/";
const API_VERSION: &str = "1";

/// Which part of the account the app key was granted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
	#[default]
	/// Only the app's own folder (`sandbox` root).
	AppFolder,
	/// The whole account (`dropbox` root).
	FullDropbox,
}
impl AccessType {
	/// Path root used by file and search endpoints.
	pub const fn root(self) -> &'static str {
		match self {
			AccessType::AppFolder => "sandbox",
			AccessType::FullDropbox => "dropbox",
		}
	}
}
impl FromStr for AccessType {
	type Err = ServiceDescriptorError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim() {
			"app_folder" | "sandbox" => Ok(Self::AppFolder),
			"dropbox" | "full_dropbox" => Ok(Self::FullDropbox),
			other => Err(ServiceDescriptorError::UnknownAccessType { value: other.to_owned() }),
		}
	}
}

/// Base URLs of the three hosts the service spreads its API across.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoints {
	/// Metadata, search, and OAuth token host.
	pub api: Url,
	/// File content host.
	pub content: Url,
	/// User-facing host serving the authorization page.
	pub web: Url,
}

/// Immutable descriptor consumed by the remote client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
	/// Endpoint definitions.
	pub endpoints: ServiceEndpoints,
	/// Granted access type.
	pub access_type: AccessType,
}
impl ServiceDescriptor {
	/// Creates a new builder seeded with the public Dropbox endpoints.
	pub fn builder() -> ServiceDescriptorBuilder {
		ServiceDescriptorBuilder::default()
	}

	/// `POST` target issuing request credentials.
	pub fn request_token_url(&self) -> Url {
		join(&self.endpoints.api, &[API_VERSION, "oauth", "request_token"])
	}

	/// `POST` target exchanging request credentials for access credentials.
	pub fn access_token_url(&self) -> Url {
		join(&self.endpoints.api, &[API_VERSION, "oauth", "access_token"])
	}

	/// User-facing authorization page (query parameters are added by the caller).
	pub fn authorize_url(&self) -> Url {
		join(&self.endpoints.web, &[API_VERSION, "oauth", "authorize"])
	}

	/// Search endpoint for the folder at `path`.
	pub fn search_url(&self, path: &str) -> Url {
		let mut url = join(&self.endpoints.api, &[API_VERSION, "search", self.access_type.root()]);

		push_remote_path(&mut url, path);

		url
	}

	/// Download endpoint for the file at `path`.
	pub fn file_url(&self, path: &str) -> Url {
		let mut url = join(&self.endpoints.content, &[API_VERSION, "files", self.access_type.root()]);

		push_remote_path(&mut url, path);

		url
	}
}
impl Default for ServiceDescriptor {
	fn default() -> Self {
		let endpoints = ServiceEndpoints {
			api: default_url(DEFAULT_API),
			content: default_url(DEFAULT_CONTENT),
			web: default_url(DEFAULT_WEB),
		};

		Self { endpoints, access_type: AccessType::default() }
	}
}

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ServiceDescriptorError {
	/// Endpoints must use HTTPS unless they point at the local machine.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Endpoint cannot carry path segments (e.g. `mailto:`).
	#[error("The {endpoint} endpoint cannot be used as a base URL: {url}.")]
	NotABase {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Access type string is not recognized.
	#[error("Unknown access type `{value}`.")]
	UnknownAccessType {
		/// Raw value supplied.
		value: String,
	},
}

/// Builder for [`ServiceDescriptor`] values.
#[derive(Debug, Default)]
pub struct ServiceDescriptorBuilder {
	/// Overrides the API host.
	pub api_endpoint: Option<Url>,
	/// Overrides the content host.
	pub content_endpoint: Option<Url>,
	/// Overrides the web host.
	pub web_endpoint: Option<Url>,
	/// Granted access type.
	pub access_type: AccessType,
}
impl ServiceDescriptorBuilder {
	/// Sets the API host.
	pub fn api_endpoint(mut self, url: Url) -> Self {
		self.api_endpoint = Some(url);

		self
	}

	/// Sets the content host.
	pub fn content_endpoint(mut self, url: Url) -> Self {
		self.content_endpoint = Some(url);

		self
	}

	/// Sets the web host.
	pub fn web_endpoint(mut self, url: Url) -> Self {
		self.web_endpoint = Some(url);

		self
	}

	/// Sets the access type.
	pub fn access_type(mut self, access_type: AccessType) -> Self {
		self.access_type = access_type;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ServiceDescriptor, ServiceDescriptorError> {
		let defaults = ServiceDescriptor::default().endpoints;
		let endpoints = ServiceEndpoints {
			api: normalize_base(self.api_endpoint.unwrap_or(defaults.api)),
			content: normalize_base(self.content_endpoint.unwrap_or(defaults.content)),
			web: normalize_base(self.web_endpoint.unwrap_or(defaults.web)),
		};
		let descriptor = ServiceDescriptor { endpoints, access_type: self.access_type };

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ServiceDescriptor {
	fn validate(&self) -> Result<(), ServiceDescriptorError> {
		validate_endpoint("api", &self.endpoints.api)?;
		validate_endpoint("content", &self.endpoints.content)?;
		validate_endpoint("web", &self.endpoints.web)?;

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ServiceDescriptorError> {
	if url.cannot_be_a_base() {
		return Err(ServiceDescriptorError::NotABase { endpoint: name, url: url.to_string() });
	}

	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(ServiceDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain == "localhost",
		Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
		Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	}
}

fn normalize_base(mut url: Url) -> Url {
	url.set_query(None);
	url.set_fragment(None);

	url
}

fn join(base: &Url, segments: &[&str]) -> Url {
	let mut url = base.clone();

	if let Ok(mut path) = url.path_segments_mut() {
		path.pop_if_empty().extend(segments);
	}

	url
}

fn push_remote_path(url: &mut Url, path: &str) {
	let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();

	if let Ok(mut out) = url.path_segments_mut() {
		if segments.is_empty() {
			out.push("");
		} else {
			out.extend(segments);
		}
	}
}

fn default_url(raw: &'static str) -> Url {
	// The defaults are compile-time constants; failing here would be a typo in this file.
	Url::parse(raw).unwrap_or_else(|e| unreachable!("Default endpoint `{raw}` is invalid: {e}."))
}
