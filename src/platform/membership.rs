//! Organization and team membership checks performed with an installation credential.
//!
//! Decision table:
//!
//! | endpoint | status | result |
//! |---|---|---|
//! | org | 204 | [`MembershipDecision::Active`] |
//! | team | 200, `state == "active"` | [`MembershipDecision::Active`] |
//! | team | 200, any other state | [`MembershipDecision::Pending`] |
//! | both | 404 | [`MembershipDecision::NotFound`] |
//! | both | 403 | [`Error::Forbidden`] |
//! | both | anything else | [`Error::Upstream`] |

// crates.io
use reqwest::Method;
// self
use crate::{
	_prelude::*,
	auth::{InstallationCredential, Login, OrgName, TeamSlug},
	error,
	http::RawResponse,
	obs::{self, FlowKind},
	platform::Platform,
};

const OPERATION: &str = "membership";

/// Who to check, and where.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MembershipQuery {
	/// User whose membership is checked.
	pub username: Login,
	/// Organization to check against.
	pub organization: OrgName,
	/// Team within the organization, for team-level checks.
	pub team: Option<TeamSlug>,
}
impl MembershipQuery {
	/// Builds an organization-level query; empty or malformed inputs are validation errors.
	pub fn new(username: &str, organization: &str) -> Result<Self> {
		Ok(Self {
			username: Login::new(username)?,
			organization: OrgName::new(organization)?,
			team: None,
		})
	}

	/// Narrows the query to a team; an empty or malformed slug is a validation error.
	pub fn with_team(mut self, team: &str) -> Result<Self> {
		self.team = Some(TeamSlug::new(team)?);

		Ok(self)
	}
}

/// Outcome of a membership check that the platform answered definitively.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MembershipDecision {
	/// The user is an active member.
	Active,
	/// The user has an outstanding invitation; never authorizes.
	Pending,
	/// The user is not a member.
	NotFound,
}
impl MembershipDecision {
	/// Returns `true` only for [`MembershipDecision::Active`].
	pub fn is_active(self) -> bool {
		matches!(self, Self::Active)
	}

	/// Returns a stable label for logs and messages.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Active => "active",
			Self::Pending => "pending",
			Self::NotFound => "not_found",
		}
	}
}
impl Display for MembershipDecision {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Deserialize)]
struct TeamMembershipResponse {
	state: String,
}

/// Queries membership state using an already issued credential as bearer.
#[derive(Clone, Debug)]
pub struct MembershipVerifier {
	platform: Platform,
}
impl MembershipVerifier {
	/// Creates a verifier that talks to `platform`.
	pub fn new(platform: Platform) -> Self {
		Self { platform }
	}

	/// Checks team membership when the query names a team, organization membership otherwise.
	pub async fn verify(
		&self,
		credential: &InstallationCredential,
		query: &MembershipQuery,
	) -> Result<MembershipDecision> {
		match &query.team {
			Some(team) =>
				self.verify_team(credential, &query.username, &query.organization, team).await,
			None =>
				self.verify_organization(credential, &query.username, &query.organization).await,
		}
	}

	/// `GET /orgs/{org}/members/{user}`.
	pub async fn verify_organization(
		&self,
		credential: &InstallationCredential,
		username: &Login,
		organization: &OrgName,
	) -> Result<MembershipDecision> {
		obs::observe(FlowKind::Membership, "organization", async move {
			let url = self.platform.endpoint(&[
				"orgs",
				organization.as_ref(),
				"members",
				username.as_ref(),
			])?;
			let response = self.get(credential, url).await?;
			let decision = match response.status {
				StatusCode::NO_CONTENT => MembershipDecision::Active,
				_ => classify_failure(response, || {
					format!("members of organization {organization}")
				})?,
			};

			tracing::info!(%username, %organization, %decision, "Checked organization membership.");

			Ok(decision)
		})
		.await
	}

	/// `GET /orgs/{org}/teams/{team}/memberships/{user}`.
	pub async fn verify_team(
		&self,
		credential: &InstallationCredential,
		username: &Login,
		organization: &OrgName,
		team: &TeamSlug,
	) -> Result<MembershipDecision> {
		obs::observe(FlowKind::Membership, "team", async move {
			let url = self.platform.endpoint(&[
				"orgs",
				organization.as_ref(),
				"teams",
				team.as_ref(),
				"memberships",
				username.as_ref(),
			])?;
			let response = self.get(credential, url).await?;
			let decision = match response.status {
				StatusCode::OK => {
					let payload =
						error::decode_json::<TeamMembershipResponse>(OPERATION, &response.body)?;

					if payload.state == "active" {
						MembershipDecision::Active
					} else {
						MembershipDecision::Pending
					}
				},
				_ => classify_failure(response, || {
					format!("memberships of team {organization}/{team}")
				})?,
			};

			tracing::info!(%username, %organization, %team, %decision, "Checked team membership.");

			Ok(decision)
		})
		.await
	}

	async fn get(&self, credential: &InstallationCredential, url: Url) -> Result<RawResponse> {
		let request = self.platform.request(Method::GET, url, credential.token.expose());

		self.platform.http().send(OPERATION, request).await
	}
}

fn classify_failure(
	response: RawResponse,
	resource: impl FnOnce() -> String,
) -> Result<MembershipDecision> {
	match response.status {
		StatusCode::NOT_FOUND => Ok(MembershipDecision::NotFound),
		StatusCode::FORBIDDEN => {
			tracing::warn!(body = %response.text(), "Credential cannot read membership.");

			Err(Error::Forbidden { resource: resource() })
		},
		_ => Err(response.into_upstream_error()),
	}
}
