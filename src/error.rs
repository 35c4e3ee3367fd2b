//! Broker-level error types shared across the signer, platform calls, server, and client.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Identity key material could not be decoded or used.
	#[error(transparent)]
	Key(#[from] KeyError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Platform answered with a status the caller did not expect.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
	/// Response body could not be decoded.
	#[error(transparent)]
	Decoding(#[from] DecodingError),

	/// Caller input is missing or malformed.
	#[error("Invalid request: {reason}.")]
	Validation {
		/// Human-readable description of the rejected input.
		reason: String,
	},
	/// The membership gate rejected the user.
	#[error("Not authorized: {reason}.")]
	Authorization {
		/// Human-readable description of the failed gate.
		reason: String,
	},
	/// The broker's own credential lacks rights to perform a check.
	#[error("Credential is not permitted to read {resource}.")]
	Forbidden {
		/// Platform resource that could not be read.
		resource: String,
	},
	/// The platform answered with the expected status but an unusable body.
	#[error("Platform returned an unusable response: {reason}.")]
	InvalidResponse {
		/// Which part of the payload was unusable.
		reason: &'static str,
	},
}
impl Error {
	/// Builds a [`Error::Validation`] from any displayable reason.
	pub fn validation(reason: impl Into<String>) -> Self {
		Self::Validation { reason: reason.into() }
	}

	/// Builds a [`Error::Authorization`] from any displayable reason.
	pub fn authorization(reason: impl Into<String>) -> Self {
		Self::Authorization { reason: reason.into() }
	}
}

/// Configuration and construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A configured URL could not be parsed or joined.
	#[error("The {field} URL is invalid.")]
	InvalidUrl {
		/// Configuration field holding the URL.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A configured URL uses plain HTTP against a non-loopback host.
	#[error("The {field} URL must use HTTPS: {url}.")]
	InsecureUrl {
		/// Configuration field holding the URL.
		field: &'static str,
		/// URL that failed validation.
		url: String,
	},
	/// A configured URL cannot carry path segments.
	#[error("The {field} URL cannot be used as a base: {url}.")]
	CannotBeABase {
		/// Configuration field holding the URL.
		field: &'static str,
		/// URL that failed validation.
		url: String,
	},
	/// A configured name is not a valid identifier.
	#[error("The {field} setting is invalid.")]
	InvalidValue {
		/// Configuration field holding the value.
		field: &'static str,
		/// Underlying validation failure.
		#[source]
		source: crate::auth::IdentifierError,
	},
	/// A required configuration value is absent.
	#[error("Missing configuration value: {0}.")]
	Missing(&'static str),
	/// A configuration file could not be read or parsed.
	#[error("Configuration file `{path}` is unreadable.")]
	File {
		/// Path that failed to load.
		path: String,
		/// Underlying IO or parsing failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Wraps a file loading failure inside [`ConfigError`].
	pub fn file(
		path: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::File { path: path.into(), source: Box::new(src) }
	}
}

/// Failures tied to the application's private key.
#[derive(Debug, ThisError)]
pub enum KeyError {
	/// The material is not a recognizable PEM private key.
	#[error("Private key is not a recognizable PEM encoding.")]
	Format {
		/// Underlying decoding failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// The material decodes but is not an RSA key.
	#[error("Private key must be an RSA key, found {found}.")]
	Type {
		/// Algorithm family that was detected.
		found: &'static str,
	},
	/// Signing failed or no key material is held.
	#[error("Assertion could not be signed: {reason}.")]
	Signing {
		/// Why signing was not possible.
		reason: String,
	},
}

/// Non-success status returned by the platform, preserved verbatim for operators.
#[derive(Debug, ThisError)]
#[error("Platform returned {status} for {operation}: {body}")]
pub struct UpstreamError {
	/// Operation label (`exchange`, `installation`, `membership`, `broker`).
	pub operation: &'static str,
	/// HTTP status code.
	pub status: u16,
	/// Raw response body.
	pub body: String,
}

/// Malformed response payloads.
#[derive(Debug, ThisError)]
#[error("Response for {operation} is malformed at `{path}`.")]
pub struct DecodingError {
	/// Operation label.
	pub operation: &'static str,
	/// JSON path where decoding stopped.
	pub path: String,
	/// Structured parsing failure.
	#[source]
	pub source: serde_json::Error,
}
impl DecodingError {
	/// Converts a path-aware serde failure into a [`DecodingError`].
	pub fn from_path_error(
		operation: &'static str,
		err: serde_path_to_error::Error<serde_json::Error>,
	) -> Self {
		let path = err.path().to_string();

		Self { operation, path, source: err.into_inner() }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {operation}.")]
	Network {
		/// Operation label.
		operation: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		operation: &'static str,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { operation, source: Box::new(src) }
	}
}

/// Decodes a JSON body, reporting the failing path on error.
pub(crate) fn decode_json<T>(operation: &'static str, body: &[u8]) -> Result<T>
where
	T: for<'de> Deserialize<'de>,
{
	let mut de = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut de)
		.map_err(|err| DecodingError::from_path_error(operation, err).into())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[derive(Debug, Deserialize)]
	struct Payload {
		#[allow(dead_code)]
		account: Account,
	}
	#[derive(Debug, Deserialize)]
	struct Account {
		#[allow(dead_code)]
		login: String,
	}

	#[test]
	fn decode_json_reports_failing_path() {
		let err = decode_json::<Payload>("installation", br#"{"account":{"login":42}}"#)
			.expect_err("Numeric login should fail to decode.");

		match err {
			Error::Decoding(inner) => {
				assert_eq!(inner.operation, "installation");
				assert_eq!(inner.path, "account.login");
			},
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn upstream_error_keeps_body_verbatim() {
		let err = Error::from(UpstreamError {
			operation: "exchange",
			status: 422,
			body: "{\"message\":\"nope\"}".into(),
		});

		assert_eq!(err.to_string(), "Platform returned 422 for exchange: {\"message\":\"nope\"}");
	}
}
