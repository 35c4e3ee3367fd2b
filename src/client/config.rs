//! Client-side settings, stored as a small kebab-case JSON document.

// std
use std::{fs, io::ErrorKind, path::Path};
// self
use crate::{_prelude::*, error::ConfigError};

/// Where the broker lives and which credential to ask it for.
///
/// Numeric ids default to `0`, which means "not configured".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClientConfig {
	/// Broker root URL; a trailing slash is ignored.
	#[serde(default)]
	pub auth_server: String,
	/// Application id forwarded as `app-id`.
	#[serde(default)]
	pub app_id: u64,
	/// Installation id forwarded as `installation-id`.
	#[serde(default)]
	pub installation_id: u64,
	/// Username forwarded to the membership gate.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub username: Option<String>,
	/// Organization override forwarded as `org`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub organization: Option<String>,
	/// Team override forwarded as `team`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub team: Option<String>,
}
impl ClientConfig {
	/// Creates a configuration for the three required settings.
	pub fn new(auth_server: impl Into<String>, app_id: u64, installation_id: u64) -> Self {
		Self { auth_server: auth_server.into(), app_id, installation_id, ..Default::default() }
	}

	/// Sets the gated username.
	pub fn with_username(mut self, username: impl Into<String>) -> Self {
		self.username = Some(username.into());

		self
	}

	/// Sets the organization override.
	pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
		self.organization = Some(organization.into());

		self
	}

	/// Sets the team override.
	pub fn with_team(mut self, team: impl Into<String>) -> Self {
		self.team = Some(team.into());

		self
	}

	/// Returns `true` when the broker URL and both ids are set.
	pub fn is_configured(&self) -> bool {
		!self.auth_server.is_empty() && self.app_id != 0 && self.installation_id != 0
	}

	/// Reads a configuration file; a missing file yields the empty configuration.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let display = path.display().to_string();
		let bytes = match fs::read(path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
			Err(e) => return Err(ConfigError::file(display, e)),
		};

		serde_json::from_slice(&bytes).map_err(|e| ConfigError::file(display, e))
	}

	/// Writes the configuration as pretty-printed JSON.
	pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
		let path = path.as_ref();
		let display = path.display().to_string();
		let json = serde_json::to_vec_pretty(self).map_err(|e| ConfigError::file(&display, e))?;

		fs::write(path, json).map_err(|e| ConfigError::file(display, e))
	}
}
