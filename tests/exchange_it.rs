mod common;

// std
use std::net::TcpListener as StdTcpListener;
// crates.io
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
// self
use app_token_broker::{
	auth::IdentitySigner,
	error::{Error, KeyError},
	platform::{InstallationLookup, Platform, PlatformConfig, TokenExchanger},
	url::Url,
};

fn issued_body() -> String {
	common::credential_body(common::ISSUED_TOKEN, Duration::hours(1))
}

#[tokio::test]
async fn exchange_returns_platform_credential() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(common::access_tokens_path())
				.header_exists("authorization")
				.header("accept", "application/vnd.github+json")
				.header("x-github-api-version", "2022-11-28")
				.header_exists("user-agent");
			then.status(201)
				.header("content-type", "application/json")
				.body(issued_body());
		})
		.await;
	let credential = TokenExchanger::new(common::platform(&server), common::signer())
		.exchange(common::installation_id())
		.await
		.expect("Exchange should succeed.");

	assert_eq!(credential.token.expose(), common::ISSUED_TOKEN);
	assert!(credential.expires_at > OffsetDateTime::now_utc());

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn non_created_status_is_upstream_error_with_body() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(common::access_tokens_path());
			then.status(500).body("Internal Server Error");
		})
		.await;
	let err = TokenExchanger::new(common::platform(&server), common::signer())
		.exchange(common::installation_id())
		.await
		.expect_err("A 500 must fail the exchange.");

	match err {
		Error::Upstream(err) => {
			assert_eq!(err.status, 500);
			assert_eq!(err.body, "Internal Server Error");
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn ok_instead_of_created_is_rejected() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path(common::access_tokens_path());
			then.status(200).body(issued_body());
		})
		.await;
	let err = TokenExchanger::new(common::platform(&server), common::signer())
		.exchange(common::installation_id())
		.await
		.expect_err("Only 201 counts as success.");

	assert!(matches!(err, Error::Upstream(ref upstream) if upstream.status == 200));
}

#[tokio::test]
async fn empty_token_is_invalid_response() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path(common::access_tokens_path());
			then.status(201).body(common::credential_body("", Duration::hours(1)));
		})
		.await;
	let err = TokenExchanger::new(common::platform(&server), common::signer())
		.exchange(common::installation_id())
		.await
		.expect_err("An empty token must be rejected.");

	assert!(matches!(err, Error::InvalidResponse { .. }));
}

#[tokio::test]
async fn malformed_body_reports_decoding_path() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path(common::access_tokens_path());
			then.status(201).body("{\"token\":42}");
		})
		.await;
	let err = TokenExchanger::new(common::platform(&server), common::signer())
		.exchange(common::installation_id())
		.await
		.expect_err("A numeric token must fail to decode.");

	match err {
		Error::Decoding(err) => assert_eq!(err.path, "token"),
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn unusable_key_fails_before_any_request() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(common::access_tokens_path());
			then.status(201).body(issued_body());
		})
		.await;
	let signer = IdentitySigner::unkeyed(common::app_id());
	let err = TokenExchanger::new(common::platform(&server), signer)
		.exchange(common::installation_id())
		.await
		.expect_err("An unkeyed signer must fail.");

	assert!(matches!(err, Error::Key(KeyError::Signing { .. })));

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn unreachable_platform_is_transport_error() {
	let port = StdTcpListener::bind("127.0.0.1:0")
		.and_then(|listener| listener.local_addr())
		.expect("Ephemeral port should bind.")
		.port();
	let config = PlatformConfig::builder()
		.api_base_url(Url::parse(&format!("http://127.0.0.1:{port}")).expect("URL should parse."))
		.build()
		.expect("Loopback config should build.");
	let platform = Platform::new(config).expect("Platform should build.");
	let err = TokenExchanger::new(platform, common::signer())
		.exchange(common::installation_id())
		.await
		.expect_err("A closed port must fail.");

	assert!(matches!(err, Error::Transport(_)));
}

#[tokio::test]
async fn lookup_resolves_organization_accounts_only() {
	let server = MockServer::start_async().await;
	let path = format!("/app/installations/{}", common::INSTALLATION_ID);
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path(path.as_str()).header_exists("authorization");
			then.status(200).header("content-type", "application/json").body(
				"{\"id\":987654,\"account\":{\"login\":\"acme-corp\",\"type\":\"Organization\"}}",
			);
		})
		.await;
	let installation = InstallationLookup::new(common::platform(&server), common::signer())
		.lookup(common::installation_id())
		.await
		.expect("Lookup should succeed.");

	assert_eq!(installation.organization().as_deref(), Some("acme-corp"));
}
