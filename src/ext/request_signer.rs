//! Request signing contracts that let collaborators attach installation credentials to
//! arbitrary HTTP clients.

// crates.io
use reqwest::{
	RequestBuilder,
	header::{ACCEPT, USER_AGENT},
};
// self
use crate::{
	_prelude::*,
	auth::InstallationCredential,
	platform::{ACCEPT_MEDIA_TYPE, API_VERSION_HEADER, DEFAULT_API_VERSION},
};

/// Describes how to attach an [`InstallationCredential`] to an outbound request without
/// constraining the HTTP client type.
pub trait RequestSignerExt<Request, Error>
where
	Self: Send + Sync,
{
	/// Consumes the provided request and injects authorization state derived from the
	/// credential.
	fn attach_credential(
		&self,
		request: Request,
		credential: &InstallationCredential,
	) -> Result<Request, Error>;
}

/// Signs `reqwest` requests the way platform API calls expect: bearer token, the platform
/// media type, the pinned API version, and an identifying `User-Agent`.
#[derive(Clone, Debug)]
pub struct PlatformRequestSigner {
	user_agent: String,
	api_version: String,
}
impl PlatformRequestSigner {
	/// Creates a signer that identifies itself as `user_agent`.
	pub fn new(user_agent: impl Into<String>) -> Self {
		Self { user_agent: user_agent.into(), api_version: DEFAULT_API_VERSION.into() }
	}

	/// Overrides the pinned API version.
	pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
		self.api_version = api_version.into();

		self
	}
}
impl RequestSignerExt<RequestBuilder, Error> for PlatformRequestSigner {
	fn attach_credential(
		&self,
		request: RequestBuilder,
		credential: &InstallationCredential,
	) -> Result<RequestBuilder> {
		Ok(request
			.bearer_auth(credential.token.expose())
			.header(ACCEPT, ACCEPT_MEDIA_TYPE)
			.header(API_VERSION_HEADER, &self.api_version)
			.header(USER_AGENT, &self.user_agent))
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use reqwest::header::AUTHORIZATION;
	use time::macros::datetime;
	// self
	use super::*;

	#[test]
	fn attaches_bearer_and_platform_headers() {
		let credential = InstallationCredential::new("ghs_abc", datetime!(2030-01-01 0:00 UTC));
		let request = ReqwestClient::new().get("https://api.github.com/repos/acme/app/secrets");
		let request = PlatformRequestSigner::new("secrets-cli/1.0")
			.attach_credential(request, &credential)
			.expect("Signing should succeed.")
			.build()
			.expect("Request should build.");
		let headers = request.headers();

		assert_eq!(headers[AUTHORIZATION], "Bearer ghs_abc");
		assert_eq!(headers[ACCEPT], ACCEPT_MEDIA_TYPE);
		assert_eq!(headers[API_VERSION_HEADER], DEFAULT_API_VERSION);
		assert_eq!(headers[USER_AGENT], "secrets-cli/1.0");
	}
}
