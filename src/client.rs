//! Client-side credential cache that refreshes from a running broker.
//!
//! [`CredentialClient::credential`] holds an async mutex across the whole refresh, so at most
//! one broker request is in flight per client and concurrent callers reuse its result. A
//! cached credential is replaced once `now + 60s` reaches its expiry. Any refresh failure
//! clears the cache before the error is returned, so a stale credential is never handed out
//! after the broker has refused to renew it.

mod config;
mod metrics;

pub use config::*;
pub use metrics::*;

// std
use std::time::Instant;
// crates.io
use reqwest::RequestBuilder;
// self
use crate::{
	_prelude::*,
	auth::{AppId, InstallationCredential, InstallationId},
	error::{self, ConfigError},
	ext::{PlatformRequestSigner, RequestSignerExt},
	http::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, ReqwestHttpClient},
	obs::{self, FlowKind},
};

const OPERATION: &str = "broker";

/// Cached state guarded by the client's async mutex.
///
/// While the mutex is held for a broker call the client is refreshing; there is no separate
/// variant for it.
#[derive(Clone, Debug, Default)]
pub enum ClientCredentialState {
	/// Nothing cached, either initially or after a failed refresh.
	#[default]
	Unissued,
	/// A credential obtained from the broker.
	Valid {
		/// The cached credential.
		credential: InstallationCredential,
		/// Monotonic instant of the refresh that produced it.
		refreshed_at: Instant,
	},
}

/// Fetches installation credentials from the broker and caches them until they near expiry.
#[derive(Debug)]
pub struct CredentialClient {
	endpoint: Url,
	app_id: AppId,
	installation_id: InstallationId,
	username: Option<String>,
	organization: Option<String>,
	team: Option<String>,
	http: ReqwestHttpClient,
	signer: PlatformRequestSigner,
	state: AsyncMutex<ClientCredentialState>,
	metrics: Arc<RefreshMetrics>,
}
impl CredentialClient {
	/// Builds a client with its own HTTP transport.
	pub fn new(config: &ClientConfig) -> Result<Self> {
		let http = ReqwestHttpClient::new(DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)?;

		Self::with_http_client(config, http)
	}

	/// Builds a client over a caller-provided transport.
	pub fn with_http_client(config: &ClientConfig, http: ReqwestHttpClient) -> Result<Self> {
		if config.auth_server.is_empty() {
			return Err(ConfigError::Missing("auth-server").into());
		}

		let endpoint = token_endpoint(&config.auth_server)?;
		let app_id = AppId::new(config.app_id)?;
		let installation_id = InstallationId::new(config.installation_id)?;

		Ok(Self {
			endpoint,
			app_id,
			installation_id,
			username: non_empty(config.username.as_deref()),
			organization: non_empty(config.organization.as_deref()),
			team: non_empty(config.team.as_deref()),
			http,
			signer: PlatformRequestSigner::new(concat!(
				env!("CARGO_PKG_NAME"),
				"/",
				env!("CARGO_PKG_VERSION")
			)),
			state: AsyncMutex::new(ClientCredentialState::Unissued),
			metrics: Default::default(),
		})
	}

	/// Replaces the signer used by [`authorize`](Self::authorize).
	pub fn with_request_signer(mut self, signer: PlatformRequestSigner) -> Self {
		self.signer = signer;

		self
	}

	/// Returns the broker endpoint the client calls.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	/// Shared handle to the refresh counters.
	pub fn metrics(&self) -> Arc<RefreshMetrics> {
		self.metrics.clone()
	}

	/// Instant of the refresh that produced the cached credential, if one is cached.
	pub async fn last_refreshed(&self) -> Option<Instant> {
		match &*self.state.lock().await {
			ClientCredentialState::Valid { refreshed_at, .. } => Some(*refreshed_at),
			ClientCredentialState::Unissued => None,
		}
	}

	/// Returns a credential that stays valid for at least the refresh margin.
	pub async fn credential(&self) -> Result<InstallationCredential> {
		let mut state = self.state.lock().await;
		let now = OffsetDateTime::now_utc();

		if let ClientCredentialState::Valid { credential, .. } = &*state {
			if !credential.needs_refresh_at(now) {
				self.metrics.record_cache_hit();

				return Ok(credential.clone());
			}

			tracing::debug!(
				expires_at = %credential.expires_at,
				"Cached credential is near expiry."
			);
		}

		let result = self.fetch().await;

		self.metrics.record_refresh(result.is_ok());

		match result {
			Ok(credential) => {
				*state = ClientCredentialState::Valid {
					credential: credential.clone(),
					refreshed_at: Instant::now(),
				};

				Ok(credential)
			},
			Err(e) => {
				*state = ClientCredentialState::Unissued;

				Err(e)
			},
		}
	}

	/// Attaches a fresh credential plus platform headers to `request`.
	pub async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
		let credential = self.credential().await?;

		self.signer.attach_credential(request, &credential)
	}

	async fn fetch(&self) -> Result<InstallationCredential> {
		obs::observe(FlowKind::Refresh, "credential", async move {
			let url = self.request_url();

			tracing::info!(
				app_id = %self.app_id,
				installation_id = %self.installation_id,
				"Requesting credential from broker."
			);

			let response = self.http.send(OPERATION, self.http.post(url)).await?;

			if response.status != StatusCode::OK {
				tracing::warn!(
					status = response.status.as_u16(),
					"Broker refused to issue a credential."
				);

				return Err(response.into_upstream_error());
			}

			let credential =
				error::decode_json::<InstallationCredential>(OPERATION, &response.body)?;

			if credential.token.is_empty() {
				return Err(Error::InvalidResponse { reason: "token is empty" });
			}

			tracing::info!(
				expires_at = %credential.expires_at,
				fingerprint = %credential.token.fingerprint(),
				"Refreshed credential."
			);

			Ok(credential)
		})
		.await
	}

	fn request_url(&self) -> Url {
		let mut url = self.endpoint.clone();

		{
			let mut query = url.query_pairs_mut();

			query
				.append_pair("app-id", &self.app_id.to_string())
				.append_pair("installation-id", &self.installation_id.to_string());

			if let Some(username) = &self.username {
				query.append_pair("username", username);
			}
			if let Some(organization) = &self.organization {
				query.append_pair("org", organization);
			}
			if let Some(team) = &self.team {
				query.append_pair("team", team);
			}
		}

		url
	}
}

fn token_endpoint(auth_server: &str) -> Result<Url, ConfigError> {
	let base = auth_server.trim_end_matches('/');
	let url = Url::parse(&format!("{base}/token"))
		.map_err(|source| ConfigError::InvalidUrl { field: "auth-server", source })?;

	if url.cannot_be_a_base() {
		return Err(ConfigError::CannotBeABase { field: "auth-server", url: url.to_string() });
	}

	Ok(url)
}

fn non_empty(value: Option<&str>) -> Option<String> {
	value.filter(|value| !value.is_empty()).map(str::to_owned)
}
