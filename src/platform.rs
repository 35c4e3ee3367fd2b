//! Platform API plumbing: endpoint configuration plus the exchange, lookup, and membership
//! calls the broker composes.

pub mod config;
pub mod exchange;
pub mod installation;
pub mod membership;

pub use config::*;
pub use exchange::*;
pub use installation::*;
pub use membership::*;

// crates.io
use reqwest::{
	Method, RequestBuilder,
	header::{ACCEPT, USER_AGENT},
};
// self
use crate::{_prelude::*, error::ConfigError, http::ReqwestHttpClient};

/// Media type requested from every platform endpoint.
pub const ACCEPT_MEDIA_TYPE: &str = "application/vnd.github+json";
/// Header carrying the pinned REST API version.
pub const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";

/// Shared handle to the platform API: configuration plus HTTP transport.
///
/// Cheap to clone; every component that talks to the platform holds one instead of reading a
/// process-wide base URL.
#[derive(Clone, Debug)]
pub struct Platform {
	config: Arc<PlatformConfig>,
	http: ReqwestHttpClient,
}
impl Platform {
	/// Builds a platform handle and its HTTP client from `config`.
	pub fn new(config: PlatformConfig) -> Result<Self, ConfigError> {
		let http = ReqwestHttpClient::new(config.connect_timeout, config.request_timeout)?;

		Ok(Self::with_http_client(config, http))
	}

	/// Builds a platform handle that reuses the caller-provided transport.
	pub fn with_http_client(config: PlatformConfig, http: ReqwestHttpClient) -> Self {
		Self { config: Arc::new(config), http }
	}

	/// Returns the configuration in use.
	pub fn config(&self) -> &PlatformConfig {
		&self.config
	}

	/// Returns the HTTP transport in use.
	pub fn http(&self) -> &ReqwestHttpClient {
		&self.http
	}

	/// Joins `segments` onto the base URL, escaping each one.
	pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ConfigError> {
		let mut url = self.config.api_base_url.clone();

		{
			let mut path = url.path_segments_mut().map_err(|_| ConfigError::CannotBeABase {
				field: "api_base_url",
				url: self.config.api_base_url.to_string(),
			})?;

			path.pop_if_empty().extend(segments);
		}

		Ok(url)
	}

	/// Starts a request carrying the bearer credential and the standard platform headers.
	pub(crate) fn request(&self, method: Method, url: Url, bearer: &str) -> RequestBuilder {
		self.http
			.request(method, url)
			.bearer_auth(bearer)
			.header(ACCEPT, ACCEPT_MEDIA_TYPE)
			.header(API_VERSION_HEADER, &self.config.api_version)
			.header(USER_AGENT, &self.config.user_agent)
	}
}
