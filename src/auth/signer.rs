//! RS256 assertion signing for the application identity.
//!
//! [`PrivateKey`] decodes the PEM material once and is shared behind an [`Arc`];
//! [`IdentitySigner`] binds it to one [`AppId`] and mints a brand-new [`Assertion`] on every
//! call. Assertions are never cached.

// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
// self
use crate::{
	_prelude::*,
	auth::{AppId, TokenSecret},
	error::KeyError,
};

/// Upper bound on an assertion's lifetime accepted by the platform.
pub const ASSERTION_LIFETIME: Duration = Duration::minutes(10);

/// Decoded RSA private key used to sign assertions.
#[derive(Clone)]
pub struct PrivateKey {
	key: EncodingKey,
}
impl PrivateKey {
	/// Decodes PEM material (PKCS#1 or PKCS#8).
	///
	/// Material that is not a usable RSA key fails with [`KeyError::Format`], including an
	/// RSA-labelled block whose body does not decode; a well-formed EC or Ed25519 key fails
	/// with [`KeyError::Type`].
	pub fn from_pem(pem: impl AsRef<[u8]>) -> Result<Self, KeyError> {
		let pem = pem.as_ref();

		match EncodingKey::from_rsa_pem(pem) {
			Ok(key) => {
				// The PEM label alone is checked at decode time; the DER body is only parsed when
				// signing.
				jsonwebtoken::encode(&Header::new(Algorithm::RS256), &serde_json::json!({}), &key)
					.map_err(|source| KeyError::Format { source })?;

				Ok(Self { key })
			},
			Err(source) => {
				if EncodingKey::from_ec_pem(pem).is_ok() {
					return Err(KeyError::Type { found: "EC" });
				}
				if EncodingKey::from_ed_pem(pem).is_ok() {
					return Err(KeyError::Type { found: "Ed25519" });
				}

				Err(KeyError::Format { source })
			},
		}
	}
}
impl Debug for PrivateKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("PrivateKey(<redacted>)")
	}
}

/// Claims carried by an assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
	/// Issued-at, seconds since the Unix epoch.
	pub iat: i64,
	/// Expiry, seconds since the Unix epoch.
	pub exp: i64,
	/// Application identifier rendered as a string.
	pub iss: String,
}

/// Short-lived self-signed token proving the application identity.
pub struct Assertion {
	token: TokenSecret,
	/// Instant the assertion was minted.
	pub issued_at: OffsetDateTime,
	/// Instant after which the platform rejects it.
	pub expires_at: OffsetDateTime,
}
impl Assertion {
	/// Returns the compact JWT for use as a bearer credential.
	pub fn bearer(&self) -> &str {
		self.token.expose()
	}
}
impl Debug for Assertion {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Assertion")
			.field("token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Mints assertions for one application identity.
#[derive(Clone, Debug)]
pub struct IdentitySigner {
	app_id: AppId,
	key: Option<Arc<PrivateKey>>,
}
impl IdentitySigner {
	/// Binds an already decoded key to `app_id`.
	pub fn new(app_id: AppId, key: Arc<PrivateKey>) -> Self {
		Self { app_id, key: Some(key) }
	}

	/// Decodes `pem` and binds it to `app_id`.
	pub fn from_pem(app_id: AppId, pem: impl AsRef<[u8]>) -> Result<Self, KeyError> {
		Ok(Self::new(app_id, Arc::new(PrivateKey::from_pem(pem)?)))
	}

	/// Creates a signer without key material; every [`sign`](Self::sign) call fails.
	pub fn unkeyed(app_id: AppId) -> Self {
		Self { app_id, key: None }
	}

	/// Application identifier this signer speaks for.
	pub fn app_id(&self) -> AppId {
		self.app_id
	}

	/// Mints an assertion valid from now for [`ASSERTION_LIFETIME`].
	pub fn sign(&self) -> Result<Assertion, KeyError> {
		self.sign_at(OffsetDateTime::now_utc())
	}

	/// Mints an assertion issued at `now`.
	pub fn sign_at(&self, now: OffsetDateTime) -> Result<Assertion, KeyError> {
		let key = self
			.key
			.as_ref()
			.ok_or_else(|| KeyError::Signing { reason: "no private key is loaded".into() })?;
		let issued_at = now.replace_nanosecond(0).unwrap_or(now);
		let expires_at = issued_at + ASSERTION_LIFETIME;
		let claims = AssertionClaims {
			iat: issued_at.unix_timestamp(),
			exp: expires_at.unix_timestamp(),
			iss: self.app_id.to_string(),
		};
		let token = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key.key)
			.map_err(|e| KeyError::Signing { reason: e.to_string() })?;

		tracing::debug!(app_id = %self.app_id, %expires_at, "Minted application assertion.");

		Ok(Assertion { token: TokenSecret::new(token), issued_at, expires_at })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn app_id() -> AppId {
		AppId::new(42).expect("Fixture app id should be valid.")
	}

	#[test]
	fn garbage_material_is_a_format_error() {
		assert!(matches!(PrivateKey::from_pem(b"not-a-pem"), Err(KeyError::Format { .. })));
		assert!(matches!(PrivateKey::from_pem(b""), Err(KeyError::Format { .. })));
	}

	#[test]
	fn unkeyed_signer_refuses_to_sign() {
		let err = IdentitySigner::unkeyed(app_id()).sign().expect_err("Unkeyed signer must fail.");

		assert!(matches!(err, KeyError::Signing { .. }));
	}

	#[test]
	fn private_key_debug_is_redacted() {
		let signer = IdentitySigner::unkeyed(app_id());

		assert_eq!(format!("{:?}", signer.key), "None");
		assert_eq!(signer.app_id().get(), 42);
	}
}
