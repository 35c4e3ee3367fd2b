//! Shared fixtures for integration tests.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use httpmock::MockServer;
use time::{Duration, OffsetDateTime, format_description::well_known::Rfc3339};
// self
use app_token_broker::{
	auth::{AppId, IdentitySigner, InstallationId, PrivateKey},
	platform::{Platform, PlatformConfig},
	url::Url,
};

pub const APP_ID: u64 = 123_456;
pub const INSTALLATION_ID: u64 = 987_654;
pub const ISSUED_TOKEN: &str = "ghs_test_token";
pub const APP_KEY_PEM: &[u8] = include_bytes!("../fixtures/app-key.pem");
pub const APP_PUBLIC_KEY_PEM: &[u8] = include_bytes!("../fixtures/app-key.pub.pem");
pub const EC_KEY_PEM: &[u8] = include_bytes!("../fixtures/ec-key.pem");

pub fn app_id() -> AppId {
	AppId::new(APP_ID).expect("App id fixture should be valid.")
}

pub fn installation_id() -> InstallationId {
	InstallationId::new(INSTALLATION_ID).expect("Installation id fixture should be valid.")
}

pub fn private_key() -> Arc<PrivateKey> {
	Arc::new(PrivateKey::from_pem(APP_KEY_PEM).expect("RSA key fixture should decode."))
}

pub fn signer() -> IdentitySigner {
	IdentitySigner::new(app_id(), private_key())
}

pub fn platform(server: &MockServer) -> Platform {
	let config = PlatformConfig::builder()
		.api_base_url(Url::parse(&server.base_url()).expect("Mock server URL should parse."))
		.build()
		.expect("Loopback platform config should build.");

	Platform::new(config).expect("Platform should build.")
}

pub fn rfc3339_in(offset: Duration) -> String {
	(OffsetDateTime::now_utc() + offset).format(&Rfc3339).expect("Timestamp should format.")
}

pub fn credential_body(token: &str, offset: Duration) -> String {
	format!("{{\"token\":\"{token}\",\"expires_at\":\"{}\"}}", rfc3339_in(offset))
}

pub fn access_tokens_path() -> String {
	format!("/app/installations/{INSTALLATION_ID}/access_tokens")
}
