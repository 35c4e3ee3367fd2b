//! Assertion → installation credential exchange.

// crates.io
use reqwest::Method;
// self
use crate::{
	_prelude::*,
	auth::{IdentitySigner, InstallationCredential, InstallationId},
	error,
	obs::{self, FlowKind},
	platform::Platform,
};

const OPERATION: &str = "exchange";

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
	#[serde(default)]
	token: String,
	#[serde(default, with = "time::serde::rfc3339::option")]
	expires_at: Option<OffsetDateTime>,
}

/// Presents a fresh assertion to the platform and receives an installation credential.
#[derive(Clone, Debug)]
pub struct TokenExchanger {
	platform: Platform,
	signer: IdentitySigner,
}
impl TokenExchanger {
	/// Creates an exchanger that signs with `signer` and talks to `platform`.
	pub fn new(platform: Platform, signer: IdentitySigner) -> Self {
		Self { platform, signer }
	}

	/// Exchanges a newly minted assertion for a credential scoped to `installation_id`.
	///
	/// Only `201 Created` counts as success. The returned credential always carries a
	/// non-empty token and the platform's own expiry.
	pub async fn exchange(
		&self,
		installation_id: InstallationId,
	) -> Result<InstallationCredential> {
		obs::observe(FlowKind::Exchange, "exchange", async move {
			let assertion = self.signer.sign()?;
			let installation = installation_id.to_string();
			let url =
				self.platform.endpoint(&["app", "installations", &installation, "access_tokens"])?;

			tracing::info!(
				app_id = %self.signer.app_id(),
				%installation_id,
				"Requesting installation credential."
			);

			let request = self.platform.request(Method::POST, url, assertion.bearer());
			let response = self.platform.http().send(OPERATION, request).await?;

			if response.status != StatusCode::CREATED {
				tracing::warn!(
					status = response.status.as_u16(),
					body = %response.text(),
					"Installation credential exchange was rejected."
				);

				return Err(response.into_upstream_error());
			}

			let payload = error::decode_json::<AccessTokenResponse>(OPERATION, &response.body)?;
			let credential = validate(payload)?;

			tracing::info!(
				%installation_id,
				expires_at = %credential.expires_at,
				fingerprint = %credential.token.fingerprint(),
				"Obtained installation credential."
			);

			Ok(credential)
		})
		.await
	}
}

fn validate(payload: AccessTokenResponse) -> Result<InstallationCredential> {
	if payload.token.is_empty() {
		return Err(Error::InvalidResponse { reason: "token is empty" });
	}

	match payload.expires_at {
		Some(expires_at) if expires_at.unix_timestamp() > 0 =>
			Ok(InstallationCredential::new(payload.token, expires_at)),
		_ => Err(Error::InvalidResponse { reason: "expires_at is missing or zero" }),
	}
}
