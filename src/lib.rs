//! Markbox publishes the Markdown files of a remote storage folder as a blog: an index page,
//! one page per post, and an Atom feed, behind a one-time OAuth 1.0 connect handshake.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod content;
pub mod error;
#[cfg(feature = "reqwest")] pub mod http;
pub mod obs;
pub mod remote;
#[cfg(feature = "server")] pub mod server;
pub mod session;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(feature = "server")] use color_eyre as _;
#[cfg(test)] use httpmock as _;
