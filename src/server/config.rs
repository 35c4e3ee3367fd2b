//! Command-line and environment configuration for the broker binary.

// std
use std::{net::SocketAddr, path::PathBuf};
// crates.io
use clap::Parser;
// self
use crate::{
	_prelude::*,
	auth::{OrgName, TeamSlug},
	broker::BrokerPolicy,
	error::ConfigError,
	platform::{DEFAULT_API_BASE_URL, PlatformConfig},
};

/// Broker settings; every flag can also be supplied through its environment variable.
#[derive(Clone, Debug, Parser)]
#[command(name = "app-token-broker", version, about = "Issue GitHub App installation tokens.")]
pub struct ServerConfig {
	/// Socket address to listen on.
	#[arg(long, env = "APP_TOKEN_BROKER_LISTEN", default_value = "0.0.0.0:8080")]
	pub listen: SocketAddr,
	/// PEM file holding the application's RSA private key.
	#[arg(long, env = "APP_TOKEN_BROKER_PRIVATE_KEY_PATH")]
	pub private_key_path: PathBuf,
	/// Platform API root.
	#[arg(long, env = "APP_TOKEN_BROKER_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
	pub api_base_url: Url,
	/// Default organization for membership checks.
	#[arg(long, env = "APP_TOKEN_BROKER_ORG")]
	pub org: Option<String>,
	/// Default team whose active members may receive credentials.
	#[arg(long, env = "APP_TOKEN_BROKER_TEAM")]
	pub team: Option<String>,
	/// Gate on organization membership when an organization but no team is in effect.
	#[arg(long, env = "APP_TOKEN_BROKER_REQUIRE_ORG_MEMBERSHIP")]
	pub require_org_membership: bool,
	/// Emit JSON log lines.
	#[arg(long, env = "APP_TOKEN_BROKER_LOG_JSON")]
	pub log_json: bool,
}
impl ServerConfig {
	/// Builds the platform configuration from the API root.
	pub fn platform_config(&self) -> Result<PlatformConfig, ConfigError> {
		PlatformConfig::builder().api_base_url(self.api_base_url.clone()).build()
	}

	/// Validates the default organization and team into a [`BrokerPolicy`].
	pub fn policy(&self) -> Result<BrokerPolicy, ConfigError> {
		let organization = match self.org.as_deref() {
			Some(org) if !org.is_empty() => Some(
				OrgName::new(org)
					.map_err(|source| ConfigError::InvalidValue { field: "org", source })?,
			),
			_ => None,
		};
		let team = match self.team.as_deref() {
			Some(team) if !team.is_empty() => Some(
				TeamSlug::new(team)
					.map_err(|source| ConfigError::InvalidValue { field: "team", source })?,
			),
			_ => None,
		};

		Ok(BrokerPolicy { organization, team, require_org_membership: self.require_org_membership })
	}
}
