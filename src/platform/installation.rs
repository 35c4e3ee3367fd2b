//! Installation lookup used to auto-detect the owning organization.

// crates.io
use reqwest::Method;
// self
use crate::{
	_prelude::*,
	auth::{IdentitySigner, InstallationId, OrgName},
	error,
	obs::{self, FlowKind},
	platform::Platform,
};

const OPERATION: &str = "installation";

/// Account that owns an installation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct InstallationAccount {
	/// Account login.
	pub login: String,
	/// Account kind, `Organization` or `User`.
	#[serde(rename = "type")]
	pub kind: String,
}

/// Subset of the installation resource the broker needs.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Installation {
	/// Installation identifier.
	pub id: u64,
	/// Owning account.
	pub account: InstallationAccount,
}
impl Installation {
	/// Returns the owning organization, or `None` when a user account owns the installation.
	pub fn organization(&self) -> Option<OrgName> {
		if self.account.kind != "Organization" {
			return None;
		}

		OrgName::new(&self.account.login).ok()
	}
}

/// Reads installation metadata with an application assertion.
#[derive(Clone, Debug)]
pub struct InstallationLookup {
	platform: Platform,
	signer: IdentitySigner,
}
impl InstallationLookup {
	/// Creates a lookup that signs with `signer` and talks to `platform`.
	pub fn new(platform: Platform, signer: IdentitySigner) -> Self {
		Self { platform, signer }
	}

	/// Fetches `GET /app/installations/{id}`.
	pub async fn lookup(&self, installation_id: InstallationId) -> Result<Installation> {
		obs::observe(FlowKind::InstallationLookup, "lookup", async move {
			let assertion = self.signer.sign()?;
			let installation = installation_id.to_string();
			let url = self.platform.endpoint(&["app", "installations", &installation])?;
			let request = self.platform.request(Method::GET, url, assertion.bearer());
			let response = self.platform.http().send(OPERATION, request).await?;

			if response.status != StatusCode::OK {
				return Err(response.into_upstream_error());
			}

			let installation = error::decode_json::<Installation>(OPERATION, &response.body)?;

			tracing::debug!(
				%installation_id,
				account = %installation.account.login,
				kind = %installation.account.kind,
				"Resolved installation account."
			);

			Ok(installation)
		})
		.await
	}
}
