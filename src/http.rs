//! Transport primitives shared by platform calls and the refresh client.
//!
//! Every outbound request goes through [`ReqwestHttpClient::send`], which reads the whole body
//! into a [`RawResponse`] and maps transport failures into [`TransportError`]. Status handling
//! stays with the caller because each endpoint defines its own success code.

// std
use std::{ops::Deref, time::Duration as StdDuration};
// crates.io
use reqwest::{RequestBuilder, redirect::Policy};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError, UpstreamError},
};

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: StdDuration = StdDuration::from_secs(15);
/// Default whole-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(60);

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Redirects are never followed: the membership endpoints answer 302 for requesters outside
/// the organization, and that must surface as an unexpected status rather than being chased.
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Builds a client with the provided timeouts and redirects disabled.
	pub fn new(connect_timeout: StdDuration, timeout: StdDuration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.redirect(Policy::none())
			.connect_timeout(connect_timeout)
			.timeout(timeout)
			.build()
			.map_err(ConfigError::http_client_build)?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Sends `request`, buffering the response body.
	pub async fn send(
		&self,
		operation: &'static str,
		request: RequestBuilder,
	) -> Result<RawResponse> {
		let response =
			request.send().await.map_err(|e| TransportError::network(operation, e))?;
		let status = response.status();
		let body = response.bytes().await.map_err(|e| TransportError::network(operation, e))?;

		tracing::debug!(operation, status = status.as_u16(), "Received platform response.");

		Ok(RawResponse { operation, status, body: body.to_vec() })
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// Fully buffered HTTP response.
#[derive(Clone, Debug)]
pub struct RawResponse {
	/// Operation label used for error reporting.
	pub operation: &'static str,
	/// HTTP status.
	pub status: StatusCode,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl RawResponse {
	/// Body rendered as lossy UTF-8.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Converts the response into an [`UpstreamError`] carrying status and body verbatim.
	pub fn into_upstream_error(self) -> Error {
		let body = self.text();

		UpstreamError { operation: self.operation, status: self.status.as_u16(), body }.into()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn upstream_error_preserves_status_and_body() {
		let raw = RawResponse {
			operation: "membership",
			status: StatusCode::BAD_GATEWAY,
			body: b"upstream down".to_vec(),
		};

		match raw.into_upstream_error() {
			Error::Upstream(err) => {
				assert_eq!(err.status, 502);
				assert_eq!(err.body, "upstream down");
				assert_eq!(err.operation, "membership");
			},
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn client_builds_with_default_timeouts() {
		ReqwestHttpClient::new(DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
			.expect("Default client should build.");
	}
}
