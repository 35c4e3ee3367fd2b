mod common;

// crates.io
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
// self
use app_token_broker::{
	auth::InstallationCredential,
	error::Error,
	platform::{MembershipDecision, MembershipQuery, MembershipVerifier},
};

const ORG_PATH: &str = "/orgs/acme-corp/members/alice";
const TEAM_PATH: &str = "/orgs/acme-corp/teams/core/memberships/alice";
const ACTIVE_BODY: &str = "{\"state\":\"active\",\"role\":\"member\"}";
const PENDING_BODY: &str = "{\"state\":\"pending\",\"role\":\"member\"}";

fn credential() -> InstallationCredential {
	let expires_at = OffsetDateTime::now_utc() + Duration::hours(1);

	InstallationCredential::new(common::ISSUED_TOKEN, expires_at)
}

fn org_query() -> MembershipQuery {
	MembershipQuery::new("alice", "acme-corp").expect("Query fixture should be valid.")
}

fn team_query() -> MembershipQuery {
	org_query().with_team("core").expect("Team fixture should be valid.")
}

async fn verify_with(
	path: &'static str,
	status: u16,
	body: &'static str,
	query: MembershipQuery,
) -> Result<MembershipDecision, Error> {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(path)
				.header("authorization", format!("Bearer {}", common::ISSUED_TOKEN))
				.header("accept", "application/vnd.github+json");
			then.status(status).header("content-type", "application/json").body(body);
		})
		.await;
	let result =
		MembershipVerifier::new(common::platform(&server)).verify(&credential(), &query).await;

	mock.assert_calls_async(1).await;

	result
}

#[tokio::test]
async fn organization_no_content_is_active() {
	let decision = verify_with(ORG_PATH, 204, "", org_query())
		.await
		.expect("204 should be a decision.");

	assert_eq!(decision, MembershipDecision::Active);
}

#[tokio::test]
async fn organization_not_found_is_not_a_member() {
	let decision = verify_with(ORG_PATH, 404, "{\"message\":\"Not Found\"}", org_query())
		.await
		.expect("404 should be a decision.");

	assert_eq!(decision, MembershipDecision::NotFound);
}

#[tokio::test]
async fn organization_redirect_is_not_followed() {
	let err = verify_with(ORG_PATH, 302, "", org_query())
		.await
		.expect_err("302 must surface as an unexpected status.");

	assert!(matches!(err, Error::Upstream(ref upstream) if upstream.status == 302));
}

#[tokio::test]
async fn forbidden_is_an_error_not_a_decision() {
	let org = verify_with(ORG_PATH, 403, "{\"message\":\"Forbidden\"}", org_query()).await;
	let team = verify_with(TEAM_PATH, 403, "{\"message\":\"Forbidden\"}", team_query()).await;

	assert!(matches!(org, Err(Error::Forbidden { .. })));
	assert!(matches!(team, Err(Error::Forbidden { .. })));
}

#[tokio::test]
async fn team_state_decides_active_or_pending() {
	let active = verify_with(TEAM_PATH, 200, ACTIVE_BODY, team_query())
		.await
		.expect("Active membership should decode.");
	let pending = verify_with(TEAM_PATH, 200, PENDING_BODY, team_query())
		.await
		.expect("Pending membership should decode.");

	assert_eq!(active, MembershipDecision::Active);
	assert_eq!(pending, MembershipDecision::Pending);
}

#[tokio::test]
async fn team_not_found_is_not_a_member() {
	let decision = verify_with(TEAM_PATH, 404, "{\"message\":\"Not Found\"}", team_query())
		.await
		.expect("404 should be a decision.");

	assert_eq!(decision, MembershipDecision::NotFound);
}

#[tokio::test]
async fn undecodable_team_body_is_decoding_error() {
	let err = verify_with(TEAM_PATH, 200, "{\"role\":\"member\"}", team_query())
		.await
		.expect_err("Missing state must fail to decode.");

	assert!(matches!(err, Error::Decoding(_)));
}

#[tokio::test]
async fn other_statuses_are_upstream_errors() {
	let err = verify_with(TEAM_PATH, 502, "bad gateway", team_query())
		.await
		.expect_err("502 must fail.");

	match err {
		Error::Upstream(upstream) => {
			assert_eq!(upstream.status, 502);
			assert_eq!(upstream.body, "bad gateway");
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}
