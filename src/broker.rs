//! Credential issuance policy: exchange first, then gate on membership.
//!
//! [`CredentialBroker::issue`] is stateless per call. Each call binds a fresh
//! [`IdentitySigner`] to the requested app id, selects a [`MembershipGate`] once, performs
//! the exchange, and only then runs the membership check, because the verifier needs the
//! issued credential as its own bearer token. A credential that fails the gate is dropped
//! inside this module and never reaches the caller.

// self
use crate::{
	_prelude::*,
	auth::{
		AppId, IdentitySigner, InstallationCredential, InstallationId, Login, OrgName,
		PrivateKey, TeamSlug,
	},
	obs::{self, FlowKind},
	platform::{
		InstallationLookup, MembershipDecision, MembershipQuery, MembershipVerifier, Platform,
		TokenExchanger,
	},
};

/// Server-level defaults that individual requests may override.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BrokerPolicy {
	/// Default organization for membership checks.
	pub organization: Option<OrgName>,
	/// Default team gate.
	pub team: Option<TeamSlug>,
	/// Gate on organization membership when an organization but no team is in effect.
	pub require_org_membership: bool,
}

/// One issuance request, already parsed from the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokerRequest {
	/// Application identity to sign as.
	pub app_id: AppId,
	/// Installation to issue a credential for.
	pub installation_id: InstallationId,
	/// User subject to the membership gate.
	pub username: Option<String>,
	/// Organization override.
	pub organization: Option<String>,
	/// Team override.
	pub team: Option<String>,
}
impl BrokerRequest {
	/// Creates a request without overrides.
	pub fn new(app_id: AppId, installation_id: InstallationId) -> Self {
		Self { app_id, installation_id, username: None, organization: None, team: None }
	}

	/// Sets the gated username; empty strings count as absent.
	pub fn with_username(mut self, username: impl Into<String>) -> Self {
		self.username = non_empty(username.into());

		self
	}

	/// Sets the organization override; empty strings count as absent.
	pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
		self.organization = non_empty(organization.into());

		self
	}

	/// Sets the team override; empty strings count as absent.
	pub fn with_team(mut self, team: impl Into<String>) -> Self {
		self.team = non_empty(team.into());

		self
	}
}

/// Authorization policy applied to one request, chosen once before any upstream call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MembershipGate {
	/// Release the credential after a successful exchange.
	Open,
	/// Require active organization membership.
	Organization(MembershipQuery),
	/// Require active team membership.
	Team(MembershipQuery),
}
impl MembershipGate {
	/// Returns a stable label for logs.
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::Open => "open",
			Self::Organization(_) => "organization",
			Self::Team(_) => "team",
		}
	}
}

/// Gate selection before the organization is known.
#[derive(Debug)]
enum GatePlan {
	Open,
	Organization { username: Login, organization: OrgName },
	Team { username: Login, organization: Option<OrgName>, team: TeamSlug },
}

/// Orchestrates signing, exchange, organization auto-detection, and membership checks.
#[derive(Clone, Debug)]
pub struct CredentialBroker {
	platform: Platform,
	key: Arc<PrivateKey>,
	policy: BrokerPolicy,
}
impl CredentialBroker {
	/// Creates a broker over `platform` signing with `key`.
	pub fn new(platform: Platform, key: Arc<PrivateKey>, policy: BrokerPolicy) -> Self {
		Self { platform, key, policy }
	}

	/// Returns the configured defaults.
	pub fn policy(&self) -> &BrokerPolicy {
		&self.policy
	}

	/// Issues a credential for `request` once every required check has passed.
	pub async fn issue(&self, request: BrokerRequest) -> Result<InstallationCredential> {
		obs::observe(FlowKind::Issue, "issue", async move {
			let plan = self.plan_gate(&request)?;
			let signer = IdentitySigner::new(request.app_id, self.key.clone());
			let gate = self.resolve_gate(plan, &signer, request.installation_id).await?;

			tracing::info!(
				app_id = %request.app_id,
				installation_id = %request.installation_id,
				gate = gate.as_str(),
				"Issuing installation credential."
			);

			let credential = TokenExchanger::new(self.platform.clone(), signer)
				.exchange(request.installation_id)
				.await?;

			self.enforce(&gate, &credential).await?;

			Ok(credential)
		})
		.await
	}

	fn plan_gate(&self, request: &BrokerRequest) -> Result<GatePlan> {
		let team = match request.team.as_deref() {
			Some(team) => Some(TeamSlug::new(team)?),
			None => self.policy.team.clone(),
		};
		let organization = match request.organization.as_deref() {
			Some(organization) => Some(OrgName::new(organization)?),
			None => self.policy.organization.clone(),
		};

		match (team, organization) {
			(Some(team), organization) => {
				let username = required_username(request, "a team gate")?;

				Ok(GatePlan::Team { username, organization, team })
			},
			(None, Some(organization)) if self.policy.require_org_membership => {
				let username = required_username(request, "an organization gate")?;

				Ok(GatePlan::Organization { username, organization })
			},
			_ => Ok(GatePlan::Open),
		}
	}

	async fn resolve_gate(
		&self,
		plan: GatePlan,
		signer: &IdentitySigner,
		installation_id: InstallationId,
	) -> Result<MembershipGate> {
		let gate = match plan {
			GatePlan::Open => MembershipGate::Open,
			GatePlan::Organization { username, organization } => {
				let query = MembershipQuery { username, organization, team: None };

				MembershipGate::Organization(query)
			},
			GatePlan::Team { username, organization, team } => {
				let organization = match organization {
					Some(organization) => organization,
					None => self.detect_organization(signer, installation_id).await?,
				};

				MembershipGate::Team(MembershipQuery { username, organization, team: Some(team) })
			},
		};

		Ok(gate)
	}

	async fn detect_organization(
		&self,
		signer: &IdentitySigner,
		installation_id: InstallationId,
	) -> Result<OrgName> {
		let lookup = InstallationLookup::new(self.platform.clone(), signer.clone());
		let installation = lookup.lookup(installation_id).await.map_err(|e| {
			tracing::warn!(%installation_id, "Organization auto-detection failed: {e}.");

			match e {
				// The platform refused this installation; the caller has to name the org.
				Error::Upstream(ref upstream) if (400..500).contains(&upstream.status) =>
					Error::validation(
						"org is required when a team gate is in effect and could not be \
						 auto-detected",
					),
				e => e,
			}
		})?;
		let organization = installation.organization().ok_or_else(|| {
			Error::validation(format!(
				"installation {installation_id} is not owned by an organization; set org explicitly"
			))
		})?;

		tracing::info!(%installation_id, %organization, "Auto-detected organization.");

		Ok(organization)
	}

	async fn enforce(
		&self,
		gate: &MembershipGate,
		credential: &InstallationCredential,
	) -> Result<()> {
		let query = match gate {
			MembershipGate::Open => return Ok(()),
			MembershipGate::Organization(query) | MembershipGate::Team(query) => query,
		};
		let verifier = MembershipVerifier::new(self.platform.clone());
		let decision = verifier.verify(credential, query).await?;

		if decision.is_active() {
			return Ok(());
		}

		tracing::warn!(
			username = %query.username,
			organization = %query.organization,
			%decision,
			"Membership gate rejected the user; discarding credential."
		);

		Err(Error::authorization(denial_message(query, decision)))
	}
}

fn required_username(request: &BrokerRequest, gate: &str) -> Result<Login> {
	match request.username.as_deref() {
		Some(username) => Ok(Login::new(username)?),
		None => Err(Error::validation(format!("username is required when {gate} is in effect"))),
	}
}

fn denial_message(query: &MembershipQuery, decision: MembershipDecision) -> String {
	let scope = match &query.team {
		Some(team) => format!("team {}/{team}", query.organization),
		None => format!("organization {}", query.organization),
	};
	let detail = match decision {
		MembershipDecision::Pending => "membership is pending",
		_ => "no membership found",
	};

	format!("user {} is not an active member of {scope} ({detail})", query.username)
}

fn non_empty(value: String) -> Option<String> {
	if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::platform::PlatformConfig;

	fn broker(policy: BrokerPolicy) -> CredentialBroker {
		let config = PlatformConfig::builder().build().expect("Config should build.");
		let platform = Platform::new(config).expect("Platform should build.");
		let key = PrivateKey::from_pem(include_bytes!("../tests/fixtures/app-key.pem"))
			.expect("Fixture key should decode.");

		CredentialBroker::new(platform, Arc::new(key), policy)
	}

	fn request() -> BrokerRequest {
		BrokerRequest::new(
			AppId::new(123_456).expect("App id fixture should be valid."),
			InstallationId::new(987_654).expect("Installation id fixture should be valid."),
		)
	}

	#[test]
	fn open_when_nothing_is_configured() {
		let plan =
			broker(BrokerPolicy::default()).plan_gate(&request()).expect("Plan should succeed.");

		assert!(matches!(plan, GatePlan::Open));
	}

	#[test]
	fn organization_alone_does_not_gate_unless_required() {
		let policy = BrokerPolicy {
			organization: Some(OrgName::new("acme-corp").expect("Org fixture should be valid.")),
			..Default::default()
		};

		assert!(matches!(broker(policy.clone()).plan_gate(&request()), Ok(GatePlan::Open)));

		let strict = BrokerPolicy { require_org_membership: true, ..policy };

		assert!(matches!(
			broker(strict.clone()).plan_gate(&request()),
			Err(Error::Validation { .. })
		));
		assert!(matches!(
			broker(strict).plan_gate(&request().with_username("alice")),
			Ok(GatePlan::Organization { .. })
		));
	}

	#[test]
	fn request_team_overrides_and_requires_username() {
		let broker = broker(BrokerPolicy::default());
		let err = broker
			.plan_gate(&request().with_team("core"))
			.expect_err("Team gate without username must be rejected.");

		assert!(matches!(err, Error::Validation { ref reason } if reason.contains("username")));

		let plan = broker
			.plan_gate(&request().with_team("core").with_username("alice").with_organization(""))
			.expect("Team gate with username should plan.");

		assert!(matches!(plan, GatePlan::Team { organization: None, .. }));
	}

	#[test]
	fn malformed_overrides_are_validation_errors() {
		let err = broker(BrokerPolicy::default())
			.plan_gate(&request().with_organization("acme corp"))
			.expect_err("Whitespace in org must be rejected.");

		assert!(matches!(err, Error::Validation { .. }));
	}

	#[test]
	fn denial_message_names_scope_and_state() {
		let query = MembershipQuery::new("alice", "acme-corp")
			.and_then(|query| query.with_team("core"))
			.expect("Query fixture should be valid.");

		assert_eq!(
			denial_message(&query, MembershipDecision::Pending),
			"user alice is not an active member of team acme-corp/core (membership is pending)"
		);
	}
}
