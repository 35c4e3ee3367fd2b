//! Platform endpoint configuration and its validating builder.

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT},
};

/// Public GitHub REST API root.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
/// REST API version pinned by every request.
pub const DEFAULT_API_VERSION: &str = "2022-11-28";

/// Where and how to reach the platform API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformConfig {
	/// API root that endpoint paths are joined onto.
	pub api_base_url: Url,
	/// Value sent in the API version header.
	pub api_version: String,
	/// Identifying `User-Agent` value.
	pub user_agent: String,
	/// TCP connect timeout.
	pub connect_timeout: StdDuration,
	/// Whole-request timeout.
	pub request_timeout: StdDuration,
}
impl PlatformConfig {
	/// Returns a builder seeded with public GitHub defaults.
	pub fn builder() -> PlatformConfigBuilder {
		PlatformConfigBuilder::default()
	}
}

/// Builder for [`PlatformConfig`] values.
#[derive(Debug)]
pub struct PlatformConfigBuilder {
	/// Explicit API root, if overridden.
	pub api_base_url: Option<Url>,
	/// API version header value.
	pub api_version: String,
	/// `User-Agent` header value.
	pub user_agent: String,
	/// TCP connect timeout.
	pub connect_timeout: StdDuration,
	/// Whole-request timeout.
	pub request_timeout: StdDuration,
}
impl Default for PlatformConfigBuilder {
	fn default() -> Self {
		Self {
			api_base_url: None,
			api_version: DEFAULT_API_VERSION.into(),
			user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into(),
			connect_timeout: DEFAULT_CONNECT_TIMEOUT,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
		}
	}
}
impl PlatformConfigBuilder {
	/// Overrides the API root.
	pub fn api_base_url(mut self, url: Url) -> Self {
		self.api_base_url = Some(url);

		self
	}

	/// Overrides the API version header value.
	pub fn api_version(mut self, version: impl Into<String>) -> Self {
		self.api_version = version.into();

		self
	}

	/// Overrides the `User-Agent` header value.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = user_agent.into();

		self
	}

	/// Overrides both transport timeouts.
	pub fn timeouts(mut self, connect: StdDuration, request: StdDuration) -> Self {
		self.connect_timeout = connect;
		self.request_timeout = request;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<PlatformConfig, ConfigError> {
		let api_base_url = match self.api_base_url {
			Some(url) => url,
			None => Url::parse(DEFAULT_API_BASE_URL)
				.map_err(|source| ConfigError::InvalidUrl { field: "api_base_url", source })?,
		};

		validate_base_url("api_base_url", &api_base_url)?;

		Ok(PlatformConfig {
			api_base_url,
			api_version: self.api_version,
			user_agent: self.user_agent,
			connect_timeout: self.connect_timeout,
			request_timeout: self.request_timeout,
		})
	}
}

/// Accepts HTTPS anywhere and plain HTTP only on loopback hosts.
pub(crate) fn validate_base_url(field: &'static str, url: &Url) -> Result<(), ConfigError> {
	if url.cannot_be_a_base() {
		return Err(ConfigError::CannotBeABase { field, url: url.to_string() });
	}

	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(ConfigError::InsecureUrl { field, url: url.to_string() }),
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
