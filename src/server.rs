//! HTTP surface of the broker: `GET /healthz` and `POST /token`.

pub mod config;
pub mod error;

pub use config::*;
pub use error::*;

// std
use std::{fs, path::Path};
// crates.io
use axum::{
	Json, Router,
	extract::{Query, State, rejection::QueryRejection},
	routing::{get, post},
};
use tokio::net::TcpListener;
// self
use crate::{
	_prelude::*,
	auth::{AppId, InstallationCredential, InstallationId, PrivateKey},
	broker::{BrokerPolicy, BrokerRequest, CredentialBroker},
	error::{ConfigError, TransportError},
	platform::Platform,
};

/// Shared state handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
	/// Issuance pipeline.
	pub broker: Arc<CredentialBroker>,
}
impl AppState {
	/// Wraps a ready broker.
	pub fn new(broker: CredentialBroker) -> Self {
		Self { broker: Arc::new(broker) }
	}

	/// Loads and validates the key, then assembles the broker described by `config`.
	///
	/// Any key problem is returned here so the process can refuse to start.
	pub fn from_config(config: &ServerConfig) -> Result<Self> {
		let key = load_private_key(&config.private_key_path)?;
		let platform = Platform::new(config.platform_config()?)?;

		Ok(Self::new(CredentialBroker::new(platform, Arc::new(key), config.policy()?)))
	}
}

/// Query parameters accepted by `POST /token`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TokenQuery {
	/// Application identifier.
	pub app_id: Option<String>,
	/// Installation identifier.
	pub installation_id: Option<String>,
	/// User subject to the membership gate.
	pub username: Option<String>,
	/// Organization override.
	pub org: Option<String>,
	/// Team override.
	pub team: Option<String>,
}
impl TokenQuery {
	/// Validates the ids and folds the overrides into a [`BrokerRequest`].
	pub fn into_request(self) -> Result<BrokerRequest> {
		let app_id = self
			.app_id
			.as_deref()
			.ok_or_else(|| Error::validation("app-id is required"))?
			.parse::<AppId>()?;
		let installation_id = self
			.installation_id
			.as_deref()
			.ok_or_else(|| Error::validation("installation-id is required"))?
			.parse::<InstallationId>()?;
		let mut request = BrokerRequest::new(app_id, installation_id);

		if let Some(username) = self.username {
			request = request.with_username(username);
		}
		if let Some(org) = self.org {
			request = request.with_organization(org);
		}
		if let Some(team) = self.team {
			request = request.with_team(team);
		}

		Ok(request)
	}
}

/// Builds the broker router.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/healthz", get(healthz))
		.route("/token", post(issue_token).fallback(method_not_allowed))
		.with_state(state)
}

/// Binds `config.listen` and serves until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<()> {
	let state = AppState::from_config(&config)?;
	let policy = state.broker.policy().clone();
	let listener = TcpListener::bind(config.listen).await.map_err(TransportError::from)?;

	log_startup(&config, &policy);

	axum::serve(listener, router(state))
		.with_graceful_shutdown(shutdown_signal())
		.await
		.map_err(TransportError::from)?;

	tracing::info!("Broker stopped.");

	Ok(())
}

/// Reads and decodes the PEM key.
pub fn load_private_key(path: &Path) -> Result<PrivateKey> {
	let pem = fs::read(path).map_err(|e| ConfigError::file(path.display().to_string(), e))?;
	let key = PrivateKey::from_pem(&pem)?;

	tracing::info!(path = %path.display(), "Loaded application private key.");

	Ok(key)
}

async fn healthz() -> &'static str {
	"ok"
}

async fn issue_token(
	State(state): State<AppState>,
	query: Result<Query<TokenQuery>, QueryRejection>,
) -> Result<Json<InstallationCredential>> {
	let Query(query) = query.map_err(|e| Error::validation(e.body_text()))?;
	let credential = state.broker.issue(query.into_request()?).await?;

	Ok(Json(credential))
}

async fn method_not_allowed() -> (StatusCode, Json<ErrorBody>) {
	(StatusCode::METHOD_NOT_ALLOWED, Json(ErrorBody { message: "Method not allowed.".into() }))
}

fn log_startup(config: &ServerConfig, policy: &BrokerPolicy) {
	tracing::info!(
		listen = %config.listen,
		api_base_url = %config.api_base_url,
		organization = policy.organization.as_deref().unwrap_or("-"),
		team = policy.team.as_deref().unwrap_or("-"),
		require_org_membership = policy.require_org_membership,
		"Broker listening."
	);
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!("Failed to listen for shutdown signal: {e}.");

		return;
	}

	tracing::info!("Shutdown signal received.");
}
